//! Wire shapes shared by more than one adapter.

use serde::Deserialize;

/// Server-assigned identifier, sent as either a JSON string or an integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum IdDto {
    Text(String),
    Number(i64),
}

impl IdDto {
    pub(crate) fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::text(r#""u-42""#, "u-42")]
    #[case::number("42", "42")]
    #[case::negative("-7", "-7")]
    fn ids_decode_to_text(#[case] json: &str, #[case] expected: &str) {
        let id: IdDto = serde_json::from_str(json).expect("id decodes");
        assert_eq!(id.into_string(), expected);
    }

    #[test]
    fn fractional_ids_are_refused() {
        assert!(serde_json::from_str::<IdDto>("4.2").is_err());
    }
}
