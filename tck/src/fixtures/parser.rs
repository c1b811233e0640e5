//! Scenario file parsing.
//!
//! Parses YAML (or JSON) scenario documents into the typed [`SpecFile`]
//! structure and rejects documents the engine could never run.

use std::path::Path;

use super::operation::OperationName;
use super::types::{DataStep, ErrorKind, SpecFile, TestDefinition};
use crate::error::{TckError, TckResult};

/// Parse a scenario document from a string.
pub fn parse_spec(spec: &str, text: &str) -> TckResult<SpecFile> {
    let file: SpecFile =
        serde_yaml::from_str(text).map_err(|e| TckError::spec_load(spec, e))?;

    validate_spec(spec, &file)?;
    Ok(file)
}

/// Parse a scenario document from a file path.
pub fn parse_spec_file(path: &Path) -> TckResult<SpecFile> {
    let spec = spec_description(path);
    let content = std::fs::read_to_string(path).map_err(|e| {
        TckError::spec_load(&spec, format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_spec(&spec, &content)
}

/// Spec description derived from its source: the file's base name.
pub fn spec_description(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validate a parsed scenario document for consistency.
fn validate_spec(spec: &str, file: &SpecFile) -> TckResult<()> {
    for (index, test) in file.tests.iter().enumerate() {
        validate_test(spec, index, test)?;
    }
    Ok(())
}

/// Validate a single scenario entry.
fn validate_test(spec: &str, index: usize, test: &TestDefinition) -> TckResult<()> {
    if test.description.trim().is_empty() {
        return Err(TckError::spec_load(
            spec,
            format!("test #{} has an empty description", index),
        ));
    }

    let operation: OperationName = test
        .act
        .operation
        .parse()
        .map_err(|reason| TckError::spec_load(spec, format!("'{}': {}", test.description, reason)))?;
    let required = match operation {
        OperationName::Upload => "source",
        OperationName::Download | OperationName::Delete => "id",
    };
    if !test.act.arguments.contains_key(required) {
        return Err(TckError::spec_load(
            spec,
            format!(
                "'{}': {} requires argument '{}'",
                test.description, operation, required
            ),
        ));
    }

    // Unknown kinds are configuration errors in their own right
    if let Some(kind) = &test.assert.error {
        kind.parse::<ErrorKind>()?;
    }

    let arranged = test.arrange.iter().flat_map(|arrange| arrange.data.iter());
    let asserted = test.assert.data.iter().flatten();
    for step in arranged.chain(asserted) {
        validate_step(spec, test, step)?;
    }
    Ok(())
}

/// Validate a data step.
fn validate_step(spec: &str, test: &TestDefinition, step: &DataStep) -> TckResult<()> {
    if step.collection().is_empty() {
        return Err(TckError::spec_load(
            spec,
            format!("'{}': data step without a collection name", test.description),
        ));
    }
    if let DataStep::Update { updates, .. } = step {
        for update in updates {
            if update.u.keys().any(|operator| operator != "$set") {
                return Err(TckError::spec_load(
                    spec,
                    format!("'{}': only $set updates are supported", test.description),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
data:
  files: []
  chunks: []
tests:
  - description: "Delete when files entry does not exist"
    act:
      operation: delete
      arguments: { id: { "$oid": "000000000000000000000000" } }
    assert:
      error: "FileNotFound"
"#;

    #[test]
    fn test_parse_valid_spec() {
        let file = parse_spec("delete.yml", VALID).unwrap();
        assert_eq!(file.tests.len(), 1);
        assert!(file.data.files.is_empty());
    }

    #[test]
    fn test_malformed_document_is_spec_load_error() {
        let err = parse_spec("broken.yml", "tests: [ { description: 1").unwrap_err();
        assert!(matches!(err, TckError::SpecLoad { spec, .. } if spec == "broken.yml"));
    }

    #[test]
    fn test_unknown_operation_rejected() {
        let yaml = VALID.replace("operation: delete", "operation: rename");
        assert!(matches!(
            parse_spec("x.yml", &yaml),
            Err(TckError::SpecLoad { .. })
        ));
    }

    #[test]
    fn test_missing_argument_rejected() {
        let yaml = VALID.replace(r#"{ id: { "$oid": "000000000000000000000000" } }"#, "{}");
        let err = parse_spec("x.yml", &yaml).unwrap_err();
        assert!(err.to_string().contains("requires argument 'id'"));
    }

    #[test]
    fn test_unknown_error_kind_rejected() {
        let yaml = VALID.replace("FileNotFound", "Exploded");
        assert!(matches!(
            parse_spec("x.yml", &yaml),
            Err(TckError::UnknownErrorKind(kind)) if kind == "Exploded"
        ));
    }

    #[test]
    fn test_non_set_update_rejected() {
        let yaml = format!(
            "{}{}",
            VALID,
            r#"    arrange:
      data:
        - { update: "fs.chunks", updates: [ { q: { n: 0 }, u: { "$inc": { n: 1 } } } ] }
"#
        );
        let err = parse_spec("x.yml", &yaml).unwrap_err();
        assert!(err.to_string().contains("$set"));
    }

    #[test]
    fn test_description_is_base_name() {
        assert_eq!(
            spec_description(Path::new("/tmp/specs/upload.yml")),
            "upload.yml"
        );
    }
}
