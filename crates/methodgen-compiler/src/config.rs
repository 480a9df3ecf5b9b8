//! Generator configuration.

/// Options controlling how bodies and shells are generated.
///
/// # Example
///
/// ```
/// use methodgen_compiler::GeneratorConfig;
///
/// let config = GeneratorConfig::default()
///     .with_shell_prefix("$")
///     .with_max_nesting(8);
/// assert_eq!(config.shell_prefix, "$");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Prefix for generated shell names.
    pub shell_prefix: String,
    /// Name of the entry method generated on capture-record shells.
    pub invoke_method_name: String,
    /// Maximum number of simultaneously open blocks.
    pub max_nesting: usize,
    /// Emit `PushZero`/`PushOne` for the `int` constants 0 and 1.
    pub inline_small_constants: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            shell_prefix: "<>".to_string(),
            invoke_method_name: "invoke".to_string(),
            max_nesting: 64,
            inline_small_constants: true,
        }
    }
}

impl GeneratorConfig {
    pub fn with_shell_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.shell_prefix = prefix.into();
        self
    }

    pub fn with_invoke_method_name(mut self, name: impl Into<String>) -> Self {
        self.invoke_method_name = name.into();
        self
    }

    pub fn with_max_nesting(mut self, max: usize) -> Self {
        self.max_nesting = max;
        self
    }

    pub fn with_inline_small_constants(mut self, inline: bool) -> Self {
        self.inline_small_constants = inline;
        self
    }

    /// `<owner>.<prefix>Closure<n>`
    pub(crate) fn closure_name(&self, owner: &str, n: usize) -> String {
        format!("{owner}.{}Closure{n}", self.shell_prefix)
    }

    /// `<owner>.<prefix><method><kind>`
    pub(crate) fn iterator_shell_name(&self, owner: &str, method: &str, kind: &str) -> String {
        format!("{owner}.{}{method}{kind}", self.shell_prefix)
    }
}
