//! Configuration for output flattening.

use std::collections::BTreeSet;

/// Default number of slots the platform accepts in a single result.
pub const DEFAULT_MAX_FIELDS_PER_PART: usize = 8;

/// How schema field names are turned into slot names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NamingStyle {
    /// `var_name_one` becomes `varNameOne`.
    #[default]
    CamelCase,
    /// Slot names are the schema field names unchanged.
    Verbatim,
}

impl NamingStyle {
    /// Apply the style to a schema field name.
    pub fn apply(self, name: &str) -> String {
        match self {
            NamingStyle::Verbatim => name.to_owned(),
            NamingStyle::CamelCase => {
                let mut out = String::with_capacity(name.len());
                let mut chars = name.chars().peekable();
                while let Some(c) = chars.next() {
                    match chars.peek() {
                        Some(next) if c == '_' && next.is_ascii_lowercase() => {
                            out.push(next.to_ascii_uppercase());
                            chars.next();
                        }
                        _ => out.push(c),
                    }
                }
                out
            }
        }
    }
}

/// Configuration for mapping decoded messages onto the output surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    /// Maximum number of fields emitted in a single part.
    pub(crate) max_fields_per_part: usize,

    /// Naming of emitted slots.
    pub(crate) naming: NamingStyle,

    /// Messages to compute output shapes for, every message if empty.
    pub(crate) outputs: BTreeSet<String>,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            max_fields_per_part: DEFAULT_MAX_FIELDS_PER_PART,
            naming: NamingStyle::default(),
            outputs: BTreeSet::new(),
        }
    }
}

impl FlattenConfig {
    /// Create a new FlattenConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of fields per part.
    ///
    /// A limit of 0 is treated as 1.
    pub fn max_fields_per_part(&mut self, max: usize) -> &mut Self {
        self.max_fields_per_part = max.max(1);
        self
    }

    /// Set how slot names are derived from field names.
    pub fn naming(&mut self, naming: NamingStyle) -> &mut Self {
        self.naming = naming;
        self
    }

    /// Restrict output to the named message, may be called multiple times.
    ///
    /// Messages nested in an output message are always shaped. Any other
    /// message still decodes, but flattens to no parts.
    pub fn output_message(&mut self, name: impl Into<String>) -> &mut Self {
        self.outputs.insert(name.into());
        self
    }

    pub fn fields_per_part(&self) -> usize {
        self.max_fields_per_part
    }

    pub fn naming_style(&self) -> NamingStyle {
        self.naming
    }

    /// Names passed to [`FlattenConfig::output_message`], in sorted order.
    pub fn output_messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.outputs.iter().map(String::as_str)
    }
}
