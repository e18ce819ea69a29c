//! Parser interface
//!
//! The token-level parser of the shading dialect is an external
//! collaborator: the compiler only requires something that turns source
//! text into a [`ClassDecl`]. [`JsonParser`] is the reference
//! implementation over serde documents; engines embed their own parser by
//! implementing [`ClassParser`].

use crate::source::ShaderMacro;
use crate::{Error, Result};
use mixsl_ast::ClassDecl;

/// Turns class source text into a parsed declaration set
pub trait ClassParser: Send + Sync {
    /// Parses the named class from its source text under a macro set.
    fn parse(&self, class_name: &str, text: &str, macros: &[ShaderMacro]) -> Result<ClassDecl>;
}

/// Parses classes stored as serde documents
///
/// Macro references written as `${NAME}` are substituted with the macro
/// definition before deserializing; this stands in for the external
/// preprocessor and is not part of the language.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    /// Creates the parser.
    pub fn new() -> Self {
        JsonParser
    }
}

impl ClassParser for JsonParser {
    fn parse(&self, class_name: &str, text: &str, macros: &[ShaderMacro]) -> Result<ClassDecl> {
        let mut text = text.to_string();
        for m in macros {
            let needle = format!("${{{}}}", m.name);
            if text.contains(&needle) {
                text = text.replace(&needle, &m.definition);
            }
        }

        let class: ClassDecl = serde_json::from_str(&text).map_err(|e| Error::Parse {
            class: class_name.to_string(),
            message: e.to_string(),
        })?;

        if class.name != class_name {
            return Err(Error::Parse {
                class: class_name.to_string(),
                message: format!("document declares class {:?}", class.name),
            });
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_class() {
        let parser = JsonParser::new();
        let class = parser
            .parse("White", r#"{"name": "White"}"#, &[])
            .unwrap();
        assert_eq!(class.name, "White");
        assert!(class.declarations.is_empty());
    }

    #[test]
    fn test_macro_substitution() {
        let parser = JsonParser::new();
        let text = r#"{"name": "Lit", "bases": [${BASE}]}"#;
        let class = parser
            .parse("Lit", text, &[ShaderMacro::new("BASE", "\"LightBase\"")])
            .unwrap();
        assert_eq!(class.bases, vec!["LightBase".to_string()]);
    }

    #[test]
    fn test_name_mismatch_is_error() {
        let parser = JsonParser::new();
        let result = parser.parse("White", r#"{"name": "Black"}"#, &[]);
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
