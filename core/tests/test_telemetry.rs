#[cfg(test)]
mod telemetry_snapshot_tests {
    use std::time::Duration;

    use linepipe_core::stream::reader::ReaderExit;
    use linepipe_core::stream::StageExit;
    use linepipe_core::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};

    fn make_counters() -> TelemetryCounters {
        let mut c = TelemetryCounters::default();
        c.add_read(8);
        c.add_read(7);
        c.add_normalized(1);
        c.add_normalized(1);
        c.add_collapsed(1);
        c.add_collapsed(0);
        for _ in 0..3 {
            c.add_record(4);
        }
        c.add_residue_flushed(2);
        c
    }

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(20)); // ensure elapsed > stage times
        timer.add_stage_time(Stage::Read, Duration::from_millis(5));
        timer.add_stage_time(Stage::Write, Duration::from_millis(10));
        timer.finish();
        timer
    }

    #[test]
    fn counters_accumulate() {
        let c = make_counters();
        assert_eq!(c.lines_read, 2);
        assert_eq!(c.chars_in, 15);
        assert_eq!(c.terminators_replaced, 2);
        assert_eq!(c.pairs_collapsed, 1);
        assert_eq!(c.records_emitted, 4);
        assert_eq!(c.chars_out, 14);
        assert_eq!(c.residue_flushed, 2);
        assert_eq!(c.expected_chars_after_collapse(), 14);
    }

    #[test]
    fn counters_merge_and_add_assign_agree() {
        let a = make_counters();
        let mut merged = a.clone();
        merged.merge(&a);

        let mut summed = a.clone();
        summed += a.clone();

        assert_eq!(merged, summed);
        assert_eq!(merged.lines_read, 4);
        assert_eq!(merged.chars_out, 28);
    }

    #[test]
    fn snapshot_initializes_output_none() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), Some(ReaderExit::Sentinel));
        assert!(snapshot.output.is_none());
        assert!(snapshot.output_text().is_none());
        assert!(snapshot.stage_exits.is_empty());
    }

    #[test]
    fn attach_output_sets_output_field() {
        let mut snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), None);
        snapshot.attach_output(b"he^l\n".to_vec());

        assert_eq!(snapshot.output.as_deref(), Some(&b"he^l\n"[..]));
        assert_eq!(snapshot.output_text().as_deref(), Some("he^l\n"));
    }

    #[test]
    fn throughput_is_chars_over_elapsed() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), None);
        assert!(snapshot.elapsed >= Duration::from_millis(20));
        let expected = 15.0 / snapshot.elapsed.as_secs_f64();
        assert!((snapshot.throughput_chars_per_sec - expected).abs() < 1e-6);
    }

    #[test]
    fn sanity_check_passes_for_balanced_counts() {
        let snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), Some(ReaderExit::Sentinel));
        assert!(snapshot.sanity_check());
    }

    #[test]
    fn sanity_check_fails_on_lost_characters() {
        let mut counters = make_counters();
        counters.chars_out -= 1;
        let snapshot = TelemetrySnapshot::from(&counters, &make_timer(), None);
        assert!(!snapshot.sanity_check());
    }

    #[test]
    fn sanity_check_fails_when_stage_outlasts_run() {
        let mut timer = make_timer();
        timer.add_stage_time(Stage::Collapse, Duration::from_secs(3600));
        let snapshot = TelemetrySnapshot::from(&make_counters(), &timer, None);
        assert!(!snapshot.sanity_check());
    }

    #[test]
    fn discarded_residue_is_accounted() {
        let mut c = TelemetryCounters::default();
        c.add_read(6);
        c.add_collapsed(0);
        c.add_record(4);
        c.add_residue_discarded(2);
        let snapshot = TelemetrySnapshot::from(&c, &make_timer(), None);
        assert!(snapshot.sanity_check());
    }

    #[test]
    fn all_stages_finished_requires_four_clean_exits() {
        let mut snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), None);
        snapshot.stage_exits = Stage::ALL.iter().map(|s| (*s, StageExit::Finished)).collect();
        assert!(snapshot.all_stages_finished());

        snapshot.stage_exits[2].1 = StageExit::Cancelled;
        assert!(!snapshot.all_stages_finished());

        snapshot.stage_exits.truncate(3);
        assert!(!snapshot.all_stages_finished());
    }

    #[test]
    fn stage_times_merge_and_summary() {
        let mut a = StageTimes::default();
        a.add(Stage::Read, Duration::from_millis(2));
        a.add(Stage::Read, Duration::from_millis(3));

        let mut b = StageTimes::default();
        b.add(Stage::Read, Duration::from_millis(1));
        b.add(Stage::Normalize, Duration::from_millis(4));

        a.merge(&b);
        assert_eq!(a.get(Stage::Read), Duration::from_millis(6));
        assert_eq!(a.get(Stage::Collapse), Duration::ZERO);
        assert_eq!(a.total(), Duration::from_millis(10));
        assert!(a.has_all(&[Stage::Read, Stage::Normalize]));
        assert!(!a.has_all(&Stage::ALL));
        assert!((a.get_ms(Stage::Normalize) - 4.0).abs() < 1e-9);

        let summary = a.summary();
        assert!(summary.starts_with("read=6.000ms normalize=4.000ms"));
        assert!(summary.ends_with("write=0.000ms"));
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut snapshot = TelemetrySnapshot::from(&make_counters(), &make_timer(), Some(ReaderExit::LineLimit));
        snapshot.stage_exits = vec![(Stage::Read, StageExit::Finished)];

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""reader_exit":"LineLimit""#));
        assert!(!json.contains("\"output\""));

        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.counters, snapshot.counters);
        assert_eq!(back.stage_times.get(Stage::Write), Duration::from_millis(10));
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Collapse.to_string(), "collapse");
        assert_eq!(Stage::Read.tag(), "READER");
        assert_eq!(Stage::Write.thread_name(), "linepipe-writer");
    }
}
