//! Url-encoded form bodies with repeated fields
//!
//! Pages post parallel lists (`clo[]`, `course_code[]`, ...) and indexed
//! fields (`general_name_0`, `item_type_3`, ...), so bodies are kept as the
//! ordered list of pairs instead of a fixed struct.

use axum::Form;

/// Decoded form fields in posted order
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value of `name`, trimmed, or empty
    pub fn get(&self, name: &str) -> String {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim().to_string())
            .unwrap_or_default()
    }

    /// Every value of `name` in posted order, untrimmed
    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<Form<Vec<(String, String)>>> for FormFields {
    fn from(Form(pairs): Form<Vec<(String, String)>>) -> Self {
        Self::new(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        FormFields::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let form = fields(&[("clo[]", "a"), ("bloom[]", "Apply"), ("clo[]", ""), ("clo[]", "c")]);
        assert_eq!(form.get_all("clo[]"), vec!["a", "", "c"]);
        assert_eq!(form.get("bloom[]"), "Apply");
        assert_eq!(form.get("missing"), "");
    }
}
