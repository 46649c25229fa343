use indicatif::{ProgressBar, ProgressStyle};

use crate::ui::NerdFont;

/// Spinner shown around long external operations (clone, npm steps)
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap()
            .tick_chars("⠁⠁⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚⠒⠂⠂⠒⠲⠴⠤⠄⠄⠤⠠⠠⠤⠦⠖⠒⠐⠐⠒⠓⠋⠉⠙⠚"),
    );
    pb.set_message(message.into());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Clear the spinner line and print a clean success message
pub fn finish_success(pb: ProgressBar, message: impl Into<String>) {
    pb.finish_and_clear();
    println!("{} {}", char::from(NerdFont::Check), message.into());
}

/// Clear the spinner line without printing anything; the caller reports
/// the failure itself
pub fn finish_quiet(pb: ProgressBar) {
    pb.finish_and_clear();
}
