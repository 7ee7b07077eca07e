/// Resolution policy of a [`Mocker`](crate::Mocker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockerConfig {
    /// Unconfigured substitute calls panic, well-known conveniences are
    /// bypassed and non-public constructors are only used when requested.
    pub strict: bool,
    /// Hand out the shared file system and HTTP instances for their types.
    pub well_known: bool,
    /// Consider non-public constructors from the start.
    pub include_non_public: bool,
}

impl Default for MockerConfig {
    fn default() -> Self {
        MockerConfig {
            strict: false,
            well_known: true,
            include_non_public: false,
        }
    }
}
