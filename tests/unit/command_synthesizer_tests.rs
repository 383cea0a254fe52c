//! Unit tests for the TTS command adapter, run against `sh` stand-ins.

#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use chat_herald::config::GeneratorConfig;
use chat_herald::models::chat::ChatEvent;
use chat_herald::respond::generator::ResponseGenerator;
use chat_herald::source::parser::parse_line;
use chat_herald::speech::command::{CommandSynthesizer, Synthesizer, TextInput};
use chat_herald::AppError;

/// `sh -c <script>` with `sh` as `$0`, so appended arguments land in `"$@"`.
fn shell(script: &str) -> CommandSynthesizer {
    CommandSynthesizer::new("sh", vec!["-c".into(), script.into(), "sh".into()])
}

/// Script that records its arguments and stdin into `dir`.
fn recorder(dir: &Path) -> String {
    format!(
        "printf '%s\\n' \"$@\" > '{argv}'; cat > '{stdin}'",
        argv = dir.join("argv").display(),
        stdin = dir.join("stdin").display(),
    )
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).expect("recorded file")
}

#[tokio::test]
async fn option_like_sender_never_reaches_argv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let parsed = parse_line("New message from -w/tmp/owned: hello there").expect("parsed");
    assert_eq!(parsed.user, "-w/tmp/owned");

    let event = ChatEvent::from_parsed(&parsed).expect("valid event");
    let generator = ResponseGenerator::new(&GeneratorConfig {
        generic_pool: vec!["{user}, thanks for hanging out in chat!".into()],
        ..GeneratorConfig::default()
    });
    let reply = generator.generate(&event).await;
    assert!(reply.starts_with("-w/tmp/owned"));

    shell(&recorder(dir.path()))
        .speak(&reply)
        .await
        .expect("speak succeeds");

    assert_eq!(read(dir.path(), "argv").trim(), "");
    assert_eq!(read(dir.path(), "stdin"), format!("{reply}\n"));
}

#[tokio::test]
async fn argument_input_ends_options_before_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let synth = shell(&recorder(dir.path())).with_input(TextInput::Argument);

    synth
        .speak("-w/tmp/owned speaking the language, LFG!")
        .await
        .expect("speak succeeds");

    let argv = read(dir.path(), "argv");
    let args: Vec<&str> = argv.lines().collect();
    assert_eq!(args, vec!["--", "-w/tmp/owned speaking the language, LFG!"]);
    assert_eq!(read(dir.path(), "stdin"), "");
}

#[tokio::test]
async fn zero_exit_is_success() {
    shell("cat > /dev/null")
        .speak("gm alice")
        .await
        .expect("speak succeeds");
}

#[tokio::test]
async fn program_that_ignores_stdin_is_judged_by_exit_status() {
    shell("exit 0")
        .speak(&"long reply ".repeat(20_000))
        .await
        .expect("unread stdin is not an error");
}

#[tokio::test]
async fn non_zero_exit_is_speech_error() {
    let err = shell("echo 'no audio device' >&2; exit 3")
        .speak("gm alice")
        .await
        .expect_err("exit 3 fails");

    match err {
        AppError::Speech(message) => {
            assert!(message.contains("exited with code 3"), "{message}");
            assert!(message.contains("no audio device"), "{message}");
        }
        other => panic!("expected Speech error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_speech_error() {
    let err = CommandSynthesizer::new("chat-herald-no-such-tts", Vec::new())
        .speak("gm")
        .await
        .expect_err("spawn fails");
    assert!(matches!(err, AppError::Speech(_)));
}

/// Linux: a pid is gone once `/proc/<pid>` is absent or a zombie.
#[cfg(target_os = "linux")]
fn process_alive(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .and_then(|rest| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropped_speak_future_kills_the_program() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("pid");
    let synth = shell(&format!(
        "echo $$ > '{}'; exec sleep 30",
        pid_file.display()
    ));

    let result = tokio::time::timeout(Duration::from_millis(500), synth.speak("gm")).await;
    assert!(result.is_err(), "sleep 30 must not finish");

    let pid = std::fs::read_to_string(&pid_file).expect("pid recorded");
    let pid = pid.trim();

    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while process_alive(pid) && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!process_alive(pid), "tts process {pid} survived the timeout");
}
