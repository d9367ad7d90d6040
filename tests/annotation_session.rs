mod support;

use support::{StepClock, config_env::ConfigHomeGuard};

use std::path::Path;
use tempfile::TempDir;
use tweet_tagger::annotations::export::export_header;
use tweet_tagger::annotations::import::read_tweets;
use tweet_tagger::annotations::{
    Advance, AnnotationStore, Annotator, AnnotatorError, AnnotatorState,
};
use tweet_tagger::app_dirs;
use tweet_tagger::settings::{SettingsStore, TomlSettings};

struct Launch {
    clock: StepClock,
    annotator: Annotator<TomlSettings, StepClock>,
}

fn launch(clock: &StepClock) -> Launch {
    let store = AnnotationStore::open_default().expect("open store");
    let settings = TomlSettings::load_default().expect("load settings");
    Launch {
        clock: clock.clone(),
        annotator: Annotator::with_clock(store, settings, clock.clone()),
    }
}

fn write_csv(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write csv");
    path
}

fn config_home() -> (TempDir, ConfigHomeGuard) {
    let temp = tempfile::tempdir().expect("create tempdir");
    let home = temp.path().join("config");
    std::fs::create_dir_all(&home).expect("create config dir");
    let guard = ConfigHomeGuard::set_config_home(home);
    (temp, guard)
}

#[test]
fn session_survives_restart_and_ends_with_export() {
    let (temp, _guard) = config_home();
    let clock = StepClock::new();
    let csv = write_csv(
        temp.path(),
        "wave_3.csv",
        "id,tweets\n1,Pierwszy wpis\n2,\"Drugi, z przecinkiem\"\n3,   \n4,Trzeci\n",
    );

    let dataset = {
        let mut run = launch(&clock);
        assert_eq!(run.annotator.resume().unwrap(), None);
        let summary = run.annotator.import_csv(&csv).unwrap();
        assert_eq!(summary.total, 3);

        run.annotator.toggle_label("szczepionki").unwrap();
        run.annotator.choose_detail("szczepionki", 1).unwrap();
        run.clock.advance_ms(2_000);
        assert_eq!(run.annotator.advance().unwrap(), Advance::Moved { cursor: 1 });
        run.clock.advance_ms(500);
        run.annotator.shutdown().unwrap();
        summary.dataset_id
    };

    let settings_file = app_dirs::settings_path().unwrap();
    assert!(settings_file.is_file());

    {
        let mut run = launch(&clock);
        let active = run.annotator.resume().unwrap().expect("resumable session");
        assert_eq!(active.dataset_id, dataset);
        assert_eq!(active.cursor, 1);
        assert_eq!(
            run.annotator.current_item().unwrap().unwrap().text,
            "Drugi, z przecinkiem"
        );

        let err = run
            .annotator
            .import_csv(&write_csv(temp.path(), "other.csv", "tweets\nx\n"))
            .unwrap_err();
        assert!(matches!(err, AnnotatorError::ImportBlocked));

        run.annotator.toggle_label("inne").unwrap();
        run.annotator.choose_intent(0).unwrap();
        run.annotator.advance().unwrap();
        let Advance::AtEnd(progress) = run.annotator.advance().unwrap() else {
            panic!("expected end of dataset");
        };
        assert_eq!(progress.done, 2);
        assert_eq!(progress.missing(), 1);

        let request = run.annotator.begin_export().unwrap();
        assert_eq!(request.suggested_name, "wave_3_annotated.csv");
        let destination = temp.path().join("out").join(&request.suggested_name);
        let summary = run.annotator.finish_export(&destination).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(run.annotator.state(), AnnotatorState::Idle);

        let texts = read_tweets(&destination).unwrap();
        assert_eq!(
            texts,
            vec!["Pierwszy wpis", "Drugi, z przecinkiem", "Trzeci"]
        );
        let mut reader = csv::Reader::from_path(&destination).unwrap();
        let header: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(header, export_header());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[7], "1");
        assert_eq!(&first[15], "1");
        assert_eq!(&first[17], "2.000");
    }

    let mut run = launch(&clock);
    assert_eq!(run.annotator.resume().unwrap(), None);
    assert_eq!(run.annotator.settings().active_dataset(), None);
    assert_eq!(
        run.annotator.settings().last_export_dir(),
        Some(temp.path().join("out"))
    );
    assert!(run.annotator.store().dataset(dataset).unwrap().unwrap().exported);

    let again = run.annotator.import_csv(&csv).unwrap();
    assert_ne!(again.dataset_id, dataset);
}

#[test]
fn dwell_time_is_summed_across_launches() {
    let (temp, _guard) = config_home();
    let clock = StepClock::new();
    let csv = write_csv(temp.path(), "posts.csv", "tweets\na\nb\n");

    let first_item = {
        let mut run = launch(&clock);
        run.annotator.import_csv(&csv).unwrap();
        let item = run.annotator.current_item().unwrap().unwrap().id;
        run.clock.advance_ms(1_200);
        run.annotator.shutdown().unwrap();
        item
    };

    let mut run = launch(&clock);
    run.annotator.resume().unwrap();
    run.clock.advance_ms(800);
    run.annotator.advance().unwrap();
    run.clock.advance_ms(100);
    run.annotator.retreat().unwrap();

    let stored = run.annotator.store().item(first_item).unwrap().unwrap();
    assert_eq!(stored.dwell_ms, 2_000);
}
