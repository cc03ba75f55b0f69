use std::collections::HashMap;
use std::sync::OnceLock;

/// Global localization state
static LOCALIZER: OnceLock<Localizer> = OnceLock::new();

fn localizer() -> &'static Localizer {
    LOCALIZER.get_or_init(Localizer::new)
}

/// Load the catalogue now instead of on first lookup.
pub fn init() {
    let _ = localizer();
}

/// Get a localized message by key
pub fn t(key: &str) -> String {
    localizer().get(key)
}

/// Get a localized message by key with `{$name}` placeholders filled in
pub fn t_with_args(key: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
    localizer().get_with_args(key, args)
}

#[derive(Debug)]
pub struct Localizer {
    messages: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

const EN: &str = include_str!("../locales/en.ftl");
const NN: &str = include_str!("../locales/nn.ftl");

impl Localizer {
    fn new() -> Self {
        let language = Self::detect_language();
        Self::for_language(&language)
    }

    fn for_language(language: &str) -> Self {
        let content = match language {
            "nn" => NN,
            _ => EN,
        };
        Self {
            messages: Self::parse(content),
            fallback: Self::parse(EN),
        }
    }

    fn detect_language() -> String {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            let Ok(value) = std::env::var(var) else {
                continue;
            };
            // "nn_NO.UTF-8" -> "nn"
            let lang_code = value
                .split(['.', '_', '-'])
                .next()
                .unwrap_or_default()
                .to_lowercase();
            match lang_code.as_str() {
                "nn" | "nno" => return "nn".to_string(),
                "en" => return "en".to_string(),
                _ => continue,
            }
        }
        "en".to_string()
    }

    /// Simple `key = value` lines; `#` starts a comment.
    fn parse(content: &str) -> HashMap<String, String> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(" = "))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect()
    }

    fn get(&self, key: &str) -> String {
        self.messages
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| format!("MISSING: {key}"))
    }

    fn get_with_args(&self, key: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
        let mut message = self.get(key);
        for (var_name, value) in args {
            let placeholder = format!("{{${var_name}}}");
            message = message.replace(&placeholder, &value.to_string());
        }
        message
    }
}

#[macro_export]
macro_rules! t {
    ($key:expr) => {
        $crate::i18n::t($key)
    };
}

#[macro_export]
macro_rules! t_args {
    ($key:expr, $($name:expr => $value:expr),*) => {{
        let args: &[(&str, &dyn std::fmt::Display)] = &[
            $(
                ($name, &$value),
            )*
        ];
        $crate::i18n::t_with_args($key, args)
    }};
}
