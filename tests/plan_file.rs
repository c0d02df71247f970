use std::error::Error;
use std::io::Write;

use execkit::config::load_and_validate;
use execkit::errors::ExecError;
use execkit::exec::OutputSink;
use tempfile::NamedTempFile;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn relative_paths_are_rooted_at_the_plan_directory() -> TestResult {
    let dir = tempfile::tempdir()?;
    let plan_path = dir.path().join("Execkit.toml");
    std::fs::write(
        &plan_path,
        r#"
[defaults]
working_dir = "work"

[[step]]
name = "build"
command = "make"
output_file = "logs/build.log"

[[step]]
name = "abs"
command = "true"
working_dir = "/tmp"
"#,
    )?;

    let plan = load_and_validate(&plan_path)?;
    let steps = plan.steps();

    assert_eq!(steps[0].request.working_dir, Some(dir.path().join("work")));
    assert_eq!(
        steps[0].request.output,
        OutputSink::File(dir.path().join("logs/build.log"))
    );
    assert_eq!(steps[1].request.working_dir, Some("/tmp".into()));
    Ok(())
}

#[test]
fn unbalanced_quotes_return_invalid_command() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[step]]
name = "broken"
command = "echo 'never closed"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(ExecError::InvalidCommand(msg)) => {
            assert!(msg.contains("broken"));
            assert!(msg.contains("unbalanced"));
        }
        Err(e) => panic!("Expected InvalidCommand, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_mode_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[[step]]
name = "x"
command = "true"
mode = "sometimes"
"#
    )
    .unwrap();

    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(ExecError::TomlError(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    let result = load_and_validate("/definitely/not/here/Execkit.toml");
    assert!(matches!(result, Err(ExecError::IoError(_))));
}
