// tests/validator.rs
mod common;
use crate::common::builders::toml_value;
use crate::common::init_tracing;

use spawnpipe::config::{validate_commands, validation_failure, CommandList, CommandShapeError};
use toml::Value;

#[test]
fn non_array_commands_are_rejected() {
    init_tracing();

    for value in [
        Value::String("ls -la".to_string()),
        Value::Integer(3),
        Value::Boolean(true),
        toml_value("commands = { cmd = \"ls\" }", "commands"),
    ] {
        match validate_commands(&value) {
            Err(CommandShapeError::NotASequence { .. }) => {}
            other => panic!("expected NotASequence for {value:?}, got {other:?}"),
        }
    }
}

#[test]
fn empty_array_is_rejected() {
    init_tracing();

    let value = Value::Array(vec![]);
    assert_eq!(validate_commands(&value), Err(CommandShapeError::EmptySequence));
    assert_eq!(
        validation_failure(&value).as_deref(),
        Some("commands array must not be empty")
    );
}

#[test]
fn element_must_be_a_table_and_index_is_reported() {
    init_tracing();

    let value = toml_value(r#"commands = [{ cmd = "ls" }, "grep"]"#, "commands");
    assert_eq!(
        validate_commands(&value),
        Err(CommandShapeError::ElementNotARecord {
            index: 1,
            found: "string"
        })
    );
}

#[test]
fn missing_and_invalid_executables_are_distinguished() {
    init_tracing();

    let missing = toml_value(r#"commands = [{ args = ["-la"] }]"#, "commands");
    assert_eq!(
        validate_commands(&missing),
        Err(CommandShapeError::MissingExecutable { index: 0 })
    );

    let wrong_type = toml_value(r#"commands = [{ cmd = "ls" }, { cmd = 42 }]"#, "commands");
    assert_eq!(
        validate_commands(&wrong_type),
        Err(CommandShapeError::InvalidExecutable { index: 1 })
    );

    let empty = toml_value(r#"commands = [{ cmd = "" }]"#, "commands");
    assert_eq!(
        validate_commands(&empty),
        Err(CommandShapeError::InvalidExecutable { index: 0 })
    );
}

#[test]
fn arguments_must_be_an_array_of_strings() {
    init_tracing();

    let not_array = toml_value(r#"commands = [{ cmd = "ls", args = "-la" }]"#, "commands");
    assert_eq!(
        validate_commands(&not_array),
        Err(CommandShapeError::InvalidArguments {
            index: 0,
            found: "string"
        })
    );

    let bad_member = toml_value(
        r#"commands = [{ cmd = "head", args = ["-n", 5] }]"#,
        "commands",
    );
    assert_eq!(
        validate_commands(&bad_member),
        Err(CommandShapeError::InvalidArgument {
            index: 0,
            position: 1,
            found: "integer"
        })
    );
}

#[test]
fn first_failure_wins() {
    init_tracing();

    // Element 0 has bad args, element 1 is not a table: element 0 is reported.
    let value = toml_value(r#"commands = [{ cmd = "ls", args = [1] }, 7]"#, "commands");
    assert!(matches!(
        validate_commands(&value),
        Err(CommandShapeError::InvalidArgument { index: 0, .. })
    ));
}

#[test]
fn well_formed_list_converts_with_default_arguments() {
    init_tracing();

    let value = toml_value(
        r#"commands = [{ cmd = "yes" }, { cmd = "head", args = ["-n", "2"] }]"#,
        "commands",
    );
    assert_eq!(validation_failure(&value), None);

    let list = CommandList::try_from(&value).expect("list should validate");
    assert_eq!(list.len(), 2);
    assert_eq!(list.first().executable, "yes");
    assert!(list.first().arguments.is_empty());
    assert_eq!(list.last().arguments, vec!["-n".to_string(), "2".to_string()]);
    assert_eq!(list.to_string(), r#"yes | head "-n" "2""#);
}

#[test]
fn command_list_new_rejects_empty_input() {
    assert_eq!(CommandList::new(vec![]), Err(CommandShapeError::EmptySequence));
}
