use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use tempfile::TempDir;

/// A throwaway home with a config that keeps everything inside it and
/// leaves the remote unconfigured
struct TestHome {
    dir: TempDir,
}

impl TestHome {
    fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db = dir.path().join("data").join("dayboard.db");
        let config = format!(
            "database_path = {:?}\nseed_samples = false\nlog_level = \"debug\"\n",
            db.to_string_lossy()
        );
        fs::write(dir.path().join("config.toml"), config).expect("write config");
        Self { dir }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dayboard").expect("binary");
        cmd.env("HOME", self.dir.path())
            .env("XDG_DATA_HOME", self.dir.path().join("xdg-data"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg-config"))
            .env("DAYBOARD_SUPABASE_URL", "")
            .env("DAYBOARD_SUPABASE_KEY", "")
            .env("DAYBOARD_ACCESS_TOKEN", "")
            .arg("--config")
            .arg(self.dir.path().join("config.toml"));
        cmd
    }

    /// Run a command that prints "(ID: <id>, ...)" and return the id
    fn created_id(&self, args: &[&str]) -> String {
        let output = self.cmd().args(args).output().expect("run");
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .split("(ID: ")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .map(str::to_string)
            .expect("id in output")
    }
}

#[test]
fn add_task_then_show_board() {
    let home = TestHome::new();

    home.cmd()
        .args(["add-task", "Write release notes", "--category", "work"])
        .assert()
        .success()
        .stdout(contains("Task created").and(contains("saved locally")));

    home.cmd()
        .arg("board")
        .assert()
        .success()
        .stdout(contains("Today").and(contains("[ ]")).and(contains("Write release notes")));
}

#[test]
fn board_json_lists_seven_days() {
    let home = TestHome::new();
    let output = home.cmd().args(["board", "--json"]).output().unwrap();
    assert!(output.status.success());
    let days: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(days.as_array().map(Vec::len), Some(7));
}

#[test]
fn done_accepts_an_id_prefix() {
    let home = TestHome::new();
    let id = home.created_id(&["add-task", "Pay rent"]);

    home.cmd()
        .args(["done", &id[..8]])
        .assert()
        .success()
        .stdout(contains("Completed 'Pay rent'"));
    home.cmd()
        .args(["done", &id])
        .assert()
        .success()
        .stdout(contains("already completed"));
    home.cmd()
        .arg("board")
        .assert()
        .success()
        .stdout(contains("[x]"));
}

#[test]
fn move_changes_day_and_category() {
    let home = TestHome::new();
    let id = home.created_id(&["add-task", "Dentist", "--category", "personal"]);

    home.cmd()
        .args(["move", &id, "--to-day", "2", "--category", "work"])
        .assert()
        .success()
        .stdout(contains("Moved 'Dentist'").and(contains("work")));
}

#[test]
fn invalid_dates_are_rejected() {
    let home = TestHome::new();
    home.cmd()
        .args(["add-task", "Taxes", "--due", "next week"])
        .assert()
        .failure()
        .stderr(contains("Invalid date format"));
}

#[test]
fn unknown_task_ids_fail() {
    let home = TestHome::new();
    home.cmd()
        .args(["delete-task", "nope"])
        .assert()
        .failure()
        .stderr(contains("No task matches 'nope'"));
}

#[test]
fn notes_are_listed_with_their_category() {
    let home = TestHome::new();
    home.cmd()
        .arg("notes")
        .assert()
        .success()
        .stdout(contains("No notes yet"));

    home.cmd()
        .args(["add-note", "Book list", "--content", "- Dune", "--category", "Reading"])
        .assert()
        .success()
        .stdout(contains("Note created"));

    home.cmd()
        .arg("notes")
        .assert()
        .success()
        .stdout(contains("Book list [Reading]"));
}

#[test]
fn decisions_are_grouped_by_quadrant() {
    let home = TestHome::new();
    home.cmd()
        .args(["add-decision", "Fix prod outage", "--urgent", "--important"])
        .assert()
        .success()
        .stdout(contains("'Do first'"));
    home.cmd()
        .args(["add-decision", "Reorganise bookmarks"])
        .assert()
        .success()
        .stdout(contains("'Eliminate'"));

    home.cmd()
        .arg("decisions")
        .assert()
        .success()
        .stdout(
            contains("Do first (1)")
                .and(contains("Fix prod outage"))
                .and(contains("Schedule (0)"))
                .and(contains("Eliminate (1)")),
        );
}

#[test]
fn chatting_with_an_alter_ego() {
    let home = TestHome::new();
    let id = home.created_id(&[
        "add-alter-ego",
        "Stoic",
        "--description",
        "Calm under pressure",
        "--trait",
        "patient",
    ]);

    home.cmd()
        .args(["say", &id, "How do I handle this deadline?"])
        .assert()
        .success()
        .stdout(contains("You said it").and(contains("1 messages")));
    home.cmd()
        .args(["say", &id, "One step at a time.", "--as-alter-ego"])
        .assert()
        .success()
        .stdout(contains("Stoic said it").and(contains("2 messages")));

    home.cmd()
        .arg("alter-egos")
        .assert()
        .success()
        .stdout(contains("Stoic (1 chats)").and(contains("Calm under pressure")));
}

#[test]
fn sync_requires_a_remote() {
    let home = TestHome::new();
    home.cmd()
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("Remote store is not configured"));
}

#[test]
fn empty_text_is_rejected() {
    let home = TestHome::new();
    home.cmd()
        .args(["add-note", "   "])
        .assert()
        .failure()
        .stderr(contains("Text cannot be empty"));
}

#[test]
fn theme_can_be_listed_and_switched() {
    let home = TestHome::new();
    home.cmd()
        .arg("theme")
        .assert()
        .success()
        .stdout(contains("* default").and(contains("sticky")));

    home.cmd()
        .args(["theme", "sticky"])
        .assert()
        .success()
        .stdout(contains("Theme set to 'sticky'"));
    home.cmd()
        .arg("theme")
        .assert()
        .success()
        .stdout(contains("* sticky"));

    home.cmd()
        .args(["theme", "neon"])
        .assert()
        .failure()
        .stderr(contains("Theme not found: neon"));
}
