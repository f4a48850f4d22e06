use std::{io::Write, process::Command};

fn castle_siege() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_castle-siege"));
    let _ = command.env("RUST_LOG", "off");
    command
}

#[test]
fn runs_with_a_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp config");
    writeln!(
        file,
        r#"
        ticks = 20
        seed = 5
        waves_per_level = 1

        [[waves]]
        entries = [{{ column = 22, kind = "eyelet", count = 3 }}]
        "#
    )
    .expect("write temp config");

    let output = castle_siege()
        .arg("--config")
        .arg(file.path())
        .output()
        .expect("failed to run castle-siege");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ticks: 20"), "{stdout}");
    assert!(stdout.contains("registered: 3"), "{stdout}");
    assert!(stdout.contains("waves exhausted: true"), "{stdout}");
}

#[test]
fn dumps_the_castle_field() {
    let output = castle_siege()
        .args(["--ticks", "1", "--dump-field", "castle"])
        .output()
        .expect("failed to run castle-siege");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let dump: Vec<&str> = stdout
        .split("\n\n")
        .nth(1)
        .expect("field dump follows the summary")
        .lines()
        .collect();
    assert_eq!(dump.len(), 63, "one line per fortress row");
    assert!(dump.iter().all(|line| line.chars().count() == 63));
    assert!(dump[9].starts_with("****"), "castle cells are stationary");
    assert!(!stdout.contains('?'), "every open cell reaches the castle");
}

#[test]
fn reports_unreadable_config() {
    let output = castle_siege()
        .args(["--config", "/definitely/not/here.toml"])
        .output()
        .expect("failed to run castle-siege");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config"), "{stderr}");
}
