// This suite validates the first stage:

// * each stop condition (sentinel, end of input, line limit) emits exactly
//   one end-of-stream
// * oversize lines and source errors still end the stream
// * the sentinel needs exactly one trailing "\n" or "\r\n"
// * BufReadLines bounds the bytes pulled for one line

#[cfg(test)]
mod reader_tests {
    use std::io::{self, Cursor};
    use std::sync::Arc;

    use linepipe_core::stream::reader::is_sentinel;
    use linepipe_core::stream::{
        BufReadLines, LineQueue, LineSource, MemoryLines, Message, PipelineConfig, Reader,
        ReaderExit, SharedQueue,
    };
    use linepipe_core::types::StreamError;

    fn queue() -> SharedQueue {
        Arc::new(LineQueue::new(128))
    }

    fn drain(q: &LineQueue) -> Vec<Message> {
        std::iter::from_fn(|| q.try_pop()).collect()
    }

    fn data(lines: &[&str]) -> Vec<Message> {
        lines.iter().map(|l| Message::from(*l)).collect()
    }

    fn read_all(lines: &[&str], config: &PipelineConfig) -> (Result<ReaderExit, StreamError>, Vec<Message>) {
        let q = queue();
        let mut reader = Reader::new(MemoryLines::new(lines.iter().copied()), q.clone(), config);
        let result = reader.run();
        (result, drain(&q))
    }

    /// Yields its lines, then fails.
    struct BrokenSource(MemoryLines);

    impl LineSource for BrokenSource {
        fn next_line(&mut self) -> Result<Option<String>, StreamError> {
            match self.0.next_line()? {
                Some(line) => Ok(Some(line)),
                None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "disk gone").into()),
            }
        }
    }

    #[test]
    fn sentinel_ends_stream_and_is_not_forwarded() {
        let (result, msgs) = read_all(&["a\n", "b\n", "STOP\n", "never\n"], &PipelineConfig::default());
        assert_eq!(result.unwrap(), ReaderExit::Sentinel);

        let mut expected = data(&["a\n", "b\n"]);
        expected.push(Message::EndOfStream);
        assert_eq!(msgs, expected);
    }

    #[test]
    fn sentinel_first_forwards_nothing() {
        let (result, msgs) = read_all(&["STOP\n", "x\n"], &PipelineConfig::default());
        assert_eq!(result.unwrap(), ReaderExit::Sentinel);
        assert_eq!(msgs, vec![Message::EndOfStream]);
    }

    #[test]
    fn custom_sentinel() {
        let config = PipelineConfig::default().with_sentinel("END");
        let (result, msgs) = read_all(&["STOP\n", "END\r\n"], &config);
        assert_eq!(result.unwrap(), ReaderExit::Sentinel);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0], Message::from("STOP\n"));
    }

    #[test]
    fn unterminated_final_stop_is_data() {
        let (result, msgs) = read_all(&["a\n", "STOP"], &PipelineConfig::default());
        assert_eq!(result.unwrap(), ReaderExit::EndOfInput);
        assert_eq!(msgs, vec![Message::from("a\n"), Message::from("STOP"), Message::EndOfStream]);
    }

    #[test]
    fn end_of_input_without_sentinel() {
        let (result, msgs) = read_all(&["only\n"], &PipelineConfig::default());
        assert_eq!(result.unwrap(), ReaderExit::EndOfInput);
        assert_eq!(msgs, vec![Message::from("only\n"), Message::EndOfStream]);

        let (result, msgs) = read_all(&[], &PipelineConfig::default());
        assert_eq!(result.unwrap(), ReaderExit::EndOfInput);
        assert_eq!(msgs, vec![Message::EndOfStream]);
    }

    #[test]
    fn line_limit_stops_forwarding() {
        let config = PipelineConfig::default().with_max_input_lines(3);
        let lines = ["1\n", "2\n", "3\n", "4\n", "5\n"];
        let (result, msgs) = read_all(&lines, &config);
        assert_eq!(result.unwrap(), ReaderExit::LineLimit);

        let mut expected = data(&lines[..3]);
        expected.push(Message::EndOfStream);
        assert_eq!(msgs, expected);
    }

    #[test]
    fn oversize_line_fails_but_ends_stream() {
        // Limit counts the terminator: "abcd\n" is five characters.
        let config = PipelineConfig::default().with_max_line_len(5).with_sentinel("S");
        let (result, msgs) = read_all(&["abcd\n", "abcde\n"], &config);

        match result {
            Err(StreamError::LineTooLong { line_no, len, max }) => {
                assert_eq!((line_no, len, max), (2, 6, 5));
            }
            other => panic!("expected LineTooLong, got {other:?}"),
        }
        assert_eq!(msgs, vec![Message::from("abcd\n"), Message::EndOfStream]);
    }

    #[test]
    fn source_error_still_ends_stream() {
        let q = queue();
        let source = BrokenSource(MemoryLines::new(["a\n"]));
        let mut reader = Reader::new(source, q.clone(), &PipelineConfig::default());

        let result = reader.run();
        assert!(matches!(result, Err(StreamError::Io(_))));
        assert_eq!(drain(&q), vec![Message::from("a\n"), Message::EndOfStream]);

        let report = reader.into_report(result);
        assert!(report.error.is_some());
        assert_eq!(report.reader_exit, None);
        assert_eq!(report.counters.lines_read, 1);
    }

    #[test]
    fn closed_queue_is_reported_as_cancellation() {
        let q = queue();
        q.close();
        let mut reader = Reader::new(MemoryLines::new(["a\n"]), q.clone(), &PipelineConfig::default());

        let result = reader.run();
        assert!(result.as_ref().unwrap_err().is_cancellation());
        assert!(reader.into_report(result).error.is_none());
    }

    #[test]
    fn report_carries_counts_and_exit() {
        let q = queue();
        let mut reader = Reader::new(
            MemoryLines::new(["ab\n", "cde\n", "STOP\n"]),
            q,
            &PipelineConfig::default(),
        );
        let result = reader.run();
        let report = reader.into_report(result);

        assert_eq!(report.reader_exit, Some(ReaderExit::Sentinel));
        assert_eq!(report.counters.lines_read, 2);
        assert_eq!(report.counters.chars_in, 7);
    }

    #[test]
    fn sentinel_matching() {
        assert!(is_sentinel("STOP\n", "STOP"));
        assert!(is_sentinel("STOP\r\n", "STOP"));

        assert!(!is_sentinel("STOP\n\n", "STOP"));
        assert!(!is_sentinel("STOPPED\n", "STOP"));
        assert!(!is_sentinel(" STOP\n", "STOP"));
        assert!(!is_sentinel("stop\n", "STOP"));
        assert!(!is_sentinel("STOP\r", "STOP"));
        assert!(!is_sentinel("STOP", "STOP"));
    }

    #[test]
    fn buf_read_lines_keeps_terminators() {
        let mut src = BufReadLines::new(Cursor::new(b"one\ntwo\r\nthree".to_vec()), 100);
        assert_eq!(src.next_line().unwrap().as_deref(), Some("one\n"));
        assert_eq!(src.next_line().unwrap().as_deref(), Some("two\r\n"));
        assert_eq!(src.next_line().unwrap().as_deref(), Some("three"));
        assert_eq!(src.next_line().unwrap(), None);
    }

    #[test]
    fn buf_read_lines_bounds_oversize_reads() {
        let long = "x".repeat(1_000);
        let mut src = BufReadLines::new(Cursor::new(format!("{long}\nnext\n").into_bytes()), 10);

        // 4 bytes per char worst case, plus one to detect overflow.
        let first = src.next_line().unwrap().unwrap();
        assert_eq!(first.len(), 41);
        assert!(first.chars().count() > 10);
    }

    #[test]
    fn buf_read_lines_rejects_invalid_utf8() {
        let mut src = BufReadLines::new(Cursor::new(vec![b'a', 0xff, b'\n']), 100);
        match src.next_line() {
            Err(StreamError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected InvalidData, got {other:?}"),
        }
    }
}
