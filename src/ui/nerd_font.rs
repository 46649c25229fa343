/// Curated nerd font icons used by wam output
///
/// A small, consistent set that is well-supported across nerd font
/// implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Check,
    Cross,
    Warning,
    Info,

    // Files and folders
    Folder,
    Download,
    Archive,

    // System
    Desktop,
    Gear,
    Lock,

    // Network
    Globe,
    Link,

    // Actions
    Trash,
    Search,
    Refresh,

    // Development
    Git,
    Branch,
    Tag,
    Package,

    // Miscellaneous
    Rocket,
    Upgrade,
    List,
}

impl NerdFont {
    /// Get the Unicode character for this nerd font icon
    pub const fn unicode(&self) -> char {
        match self {
            Self::Check => '\u{f00c}',          // fa-check
            Self::Cross => '\u{f00d}',          // fa-times
            Self::Warning => '\u{f071}',        // fa-exclamation-triangle
            Self::Info => '\u{f05a}',           // fa-info-circle

            Self::Folder => '\u{f07b}',         // fa-folder
            Self::Download => '\u{f019}',       // fa-download
            Self::Archive => '\u{f187}',        // fa-archive

            Self::Desktop => '\u{f108}',        // fa-desktop
            Self::Gear => '\u{f013}',           // fa-gear
            Self::Lock => '\u{f023}',           // fa-lock

            Self::Globe => '\u{f0ac}',          // fa-globe
            Self::Link => '\u{f0c1}',           // fa-link

            Self::Trash => '\u{f1f8}',          // fa-trash
            Self::Search => '\u{f002}',         // fa-search
            Self::Refresh => '\u{f021}',        // fa-refresh

            Self::Git => '\u{f1d3}',            // fa-git
            Self::Branch => '\u{f126}',         // fa-code-branch
            Self::Tag => '\u{f02b}',            // fa-tag
            Self::Package => '\u{f187}',        // fa-archive (reused)

            Self::Rocket => '\u{f135}',         // fa-rocket
            Self::Upgrade => '\u{f0aa}',        // fa-arrow-circle-up
            Self::List => '\u{f03a}',           // fa-list
        }
    }
}

impl std::fmt::Display for NerdFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unicode())
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}

impl From<NerdFont> for String {
    fn from(icon: NerdFont) -> Self {
        icon.unicode().to_string()
    }
}
