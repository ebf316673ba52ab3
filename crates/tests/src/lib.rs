//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置文件 -> 对齐 -> 合并输出 全流程
//! - 随机时钟偏移下的合并正确性
//! - 不可达文件 / 标签别名等失败路径

#[cfg(test)]
mod support {
    use std::path::{Path, PathBuf};

    use contracts::{Address, Direction, TraceFormat, TraceRecord, TypeCode, UniqueTime};
    use ingestion::TraceWriter;

    pub fn at_nanos(nanos: i64) -> UniqueTime {
        UniqueTime::new(
            nanos.div_euclid(1_000_000_000),
            nanos.rem_euclid(1_000_000_000) as u32,
            0,
        )
    }

    pub fn record(timestamp: UniqueTime, tag: i32, payload: String) -> TraceRecord {
        TraceRecord::new(timestamp, TypeCode::ItcState, Address::Itc(Direction::Nw))
            .with_sync_tag(tag)
            .with_payload(payload.into_bytes())
    }

    pub fn write_log(
        dir: &Path,
        name: &str,
        format: Option<TraceFormat>,
        records: &[TraceRecord],
    ) -> PathBuf {
        let path = dir.join(name);
        let mut writer = TraceWriter::create(&path, format).unwrap();
        for r in records {
            writer.append(r).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    /// Seconds-based log: `(local seconds, tag)`
    pub fn simple_log(dir: &Path, name: &str, entries: &[(f64, i32)]) -> PathBuf {
        let records: Vec<TraceRecord> = entries
            .iter()
            .map(|(s, tag)| record(UniqueTime::from_secs_f64(*s), *tag, format!("{name}@{s}")))
            .collect();
        write_log(dir, name, None, &records)
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;

    use config_loader::ConfigLoader;
    use contracts::{
        ClockOffset, DeltaSource, FileNumber, MergedRecord, OffsetStrategy, TraceFormat,
        TraceRecord, UniqueTime, WeaverError,
    };
    use observability::MergeMetricsAggregator;
    use sync_engine::{Alignment, AlignmentConfig};
    use tempfile::TempDir;
    use timeline::{DumpSink, JsonSink, TimestampStyle};

    use crate::support::{at_nanos, record, simple_log, write_log};

    /// A anchors; B starts 2.0s after A; C talks only to B and starts 3.5s after it
    fn transitive_corpus(dir: &TempDir) -> Vec<std::path::PathBuf> {
        vec![
            simple_log(dir.path(), "a.jsonl", &[(100.0, 0), (101.0, 1), (104.0, 0)]),
            simple_log(
                dir.path(),
                "b.jsonl",
                &[(102.0, 0), (102.5, -1), (103.0, 2), (106.0, 0)],
            ),
            simple_log(dir.path(), "c.jsonl", &[(105.5, 0), (105.7, -2), (109.0, 0)]),
        ]
    }

    /// End-to-end: config file -> Alignment -> DumpSink
    #[test]
    fn test_e2e_config_to_dump() {
        let dir = TempDir::new().unwrap();
        let paths = transitive_corpus(&dir);

        let config_path = dir.path().join("weaver.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "outlier_tolerance_ms = 1.0\n\n[[tweaks]]\nfile = 2\nmicros = 1000").unwrap();
        drop(file);

        let config = ConfigLoader::load_from_path(&config_path).unwrap();
        let mut alignment = Alignment::open(&paths, config).unwrap();

        let mut sink = DumpSink::new("dump", Vec::new(), TimestampStyle::Raw);
        let written = alignment.merge_into(&mut sink).unwrap();
        assert_eq!(written, 10);

        let assignment = alignment.assignment().unwrap();
        assert_eq!(assignment.anchor, FileNumber::new(0));
        assert_eq!(
            assignment.offset(FileNumber::new(2)),
            Some(ClockOffset::from_secs_f64(5.5) + ClockOffset::from_micros(1000))
        );

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 10);
        // mergedIndex timestamp fileNumber address payload
        let first: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(first[0], "0");
        assert_eq!(first[2], "0");
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.split_whitespace().next(), Some(i.to_string().as_str()));
        }

        let report = alignment.report().unwrap().to_string();
        assert!(report.starts_with("=== Alignment ==="));
    }

    /// JSON lines output parses back into the merged records
    #[test]
    fn test_e2e_json_output() {
        let dir = TempDir::new().unwrap();
        let paths = transitive_corpus(&dir);
        let mut alignment = Alignment::open(&paths, AlignmentConfig::default()).unwrap();

        let mut sink = JsonSink::new("json", Vec::new());
        alignment.merge_into(&mut sink).unwrap();
        assert_eq!(sink.written(), 10);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let merged: Vec<MergedRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert!(merged
            .windows(2)
            .all(|w| w[0].record.timestamp <= w[1].record.timestamp));
        assert_eq!(
            merged.iter().map(|m| m.index).collect::<Vec<_>>(),
            (0..10).collect::<Vec<u64>>()
        );
    }

    /// Logs in different formats align together
    #[test]
    fn test_e2e_mixed_formats() {
        let dir = TempDir::new().unwrap();
        let a = write_log(
            dir.path(),
            "a.bin",
            Some(TraceFormat::Bincode),
            &[
                record(UniqueTime::new(10, 0, 0), 0, "a0".into()),
                record(UniqueTime::new(11, 0, 0), 5, "a1".into()),
            ],
        );
        let b = write_log(
            dir.path(),
            "b.jsonl",
            None,
            &[
                record(UniqueTime::new(50, 0, 0), 0, "b0".into()),
                record(UniqueTime::new(50, 500_000_000, 0), -5, "b1".into()),
            ],
        );

        let mut alignment = Alignment::open(&[a, b], AlignmentConfig::default()).unwrap();
        let merged: Vec<MergedRecord> = alignment.merger().unwrap().map(|r| r.unwrap()).collect();
        let payloads: Vec<String> = merged
            .iter()
            .map(|m| String::from_utf8(m.record.payload.to_vec()).unwrap())
            .collect();
        assert_eq!(payloads, vec!["a0", "b0", "b1", "a1"]);
        assert_eq!(
            alignment.assignment().unwrap().offset(FileNumber::new(1)),
            Some(ClockOffset::from_secs_f64(40.0))
        );
    }

    /// Random skews: aligned order equals true-time order for any chain of logs
    #[test]
    fn test_e2e_random_skews_recover_true_order() {
        use rand::Rng;

        let mut rng = rand::rng();
        for _ in 0..5 {
            let dir = TempDir::new().unwrap();
            let files = rng.random_range(2..6usize);
            let skews: Vec<i64> = (0..files)
                .map(|_| rng.random_range(0..5_000_000i64) * 1_000)
                .collect();

            // True time in ns; every event gets a distinct instant
            let mut next_true = 0i64;
            let mut tick = |rng: &mut rand::rngs::ThreadRng| {
                next_true += rng.random_range(1..1_000_000i64);
                next_true
            };

            let mut logs: Vec<Vec<(i64, i32)>> = vec![Vec::new(); files];
            // Staggered starts: file 0 reaches back farthest
            for log in logs.iter_mut() {
                let t = tick(&mut rng);
                log.push((t, 0));
            }
            // One shared tag per neighbouring pair
            for i in 1..files {
                let t = tick(&mut rng);
                logs[i - 1].push((t, i as i32));
                logs[i].push((t, -(i as i32)));
            }
            for _ in 0..40 {
                let t = tick(&mut rng);
                let which = rng.random_range(0..files);
                logs[which].push((t, 0));
            }

            let paths: Vec<_> = logs
                .iter()
                .enumerate()
                .map(|(i, events)| {
                    let records: Vec<TraceRecord> = events
                        .iter()
                        .map(|(t, tag)| record(at_nanos(t + skews[i]), *tag, t.to_string()))
                        .collect();
                    write_log(dir.path(), &format!("log{i}.jsonl"), None, &records)
                })
                .collect();

            let config = AlignmentConfig {
                delta_source: DeltaSource::MatchedRecord,
                ..Default::default()
            };
            let mut alignment = Alignment::open(&paths, config).unwrap();

            let assignment = alignment.align().unwrap().clone();
            assert_eq!(assignment.anchor, FileNumber::new(0));
            for (i, skew) in skews.iter().enumerate() {
                assert_eq!(
                    assignment.offset(FileNumber::new(i as u16)),
                    Some(ClockOffset::from_nanos(skew - skews[0])),
                    "file {i}"
                );
            }

            let mut aggregator = MergeMetricsAggregator::new();
            let true_times: Vec<i64> = alignment
                .merger()
                .unwrap()
                .map(|r| {
                    let entry = r.unwrap();
                    aggregator.update(&entry);
                    String::from_utf8(entry.record.payload.to_vec())
                        .unwrap()
                        .parse()
                        .unwrap()
                })
                .collect();

            let mut expected: Vec<i64> = logs.iter().flatten().map(|(t, _)| *t).collect();
            expected.sort_unstable();
            assert_eq!(true_times, expected);
            assert_eq!(aggregator.summary().total_records, expected.len() as u64);
            assert_eq!(aggregator.summary().files, files);
        }
    }

    /// Least squares and single path agree on consistent evidence
    #[test]
    fn test_e2e_strategies_agree_on_consistent_data() {
        let dir = TempDir::new().unwrap();
        let paths = transitive_corpus(&dir);

        let offsets = |strategy: OffsetStrategy| {
            let config = AlignmentConfig {
                strategy,
                ..Default::default()
            };
            let mut alignment = Alignment::open(&paths, config).unwrap();
            let assignment = alignment.align().unwrap().clone();
            assignment.offsets
        };

        let single = offsets(OffsetStrategy::SinglePath);
        let fitted = offsets(OffsetStrategy::LeastSquares);
        assert_eq!(single.len(), fitted.len());
        for (file, offset) in &single {
            let diff = (fitted[file].as_nanos() - offset.as_nanos()).abs();
            assert!(diff <= 1, "{file}: {offset} vs {}", fitted[file]);
        }
    }

    /// Unreachable logs abort unless excluded
    #[test]
    fn test_e2e_unreachable_policy() {
        let dir = TempDir::new().unwrap();
        let mut paths = transitive_corpus(&dir);
        // A pair linked only to each other, disagreeing on whose history is older
        paths.push(simple_log(
            dir.path(),
            "d.jsonl",
            &[(200.0, 0), (201.0, 10), (202.0, 11)],
        ));
        paths.push(simple_log(
            dir.path(),
            "e.jsonl",
            &[(300.0, 0), (300.5, -10), (303.0, -11)],
        ));

        let mut strict = Alignment::open(&paths, AlignmentConfig::default()).unwrap();
        let err = strict.align().unwrap_err();
        assert!(
            matches!(&err, WeaverError::UnreachableFile { files, .. } if files.len() == 2),
            "{err}"
        );

        let config = AlignmentConfig {
            exclude_unreachable: true,
            ..Default::default()
        };
        let mut lenient = Alignment::open(&paths, config).unwrap();
        let merged = lenient.merger().unwrap().count();
        assert_eq!(merged, 10);
        assert_eq!(
            lenient.excluded(),
            &[FileNumber::new(3), FileNumber::new(4)]
        );
    }

    /// Records stamped at one repeated instant keep their issue order
    #[test]
    fn test_e2e_uniquer_orders_repeated_instants() {
        use contracts::UniquerSource;

        let dir = TempDir::new().unwrap();
        let mut stamps = UniquerSource::new();
        let records: Vec<TraceRecord> = (0..3)
            .map(|i| record(stamps.stamp(7, 250), 0, format!("burst{i}")))
            .collect::<Vec<_>>()
            .into_iter()
            .chain(std::iter::once(record(stamps.stamp(7, 251), 0, "after".into())))
            .collect();
        let path = write_log(dir.path(), "burst.jsonl", None, &records);

        let mut alignment = Alignment::open(&[path], AlignmentConfig::default()).unwrap();
        let merged: Vec<MergedRecord> = alignment.merger().unwrap().map(|r| r.unwrap()).collect();
        let uniquers: Vec<u8> = merged.iter().map(|m| m.record.timestamp.uniquer).collect();
        assert_eq!(uniquers, vec![0, 1, 2, 0]);
        assert_eq!(
            String::from_utf8(merged[3].record.payload.to_vec()).unwrap(),
            "after"
        );
    }

    /// A missing input names its path and no output is produced
    #[test]
    fn test_e2e_missing_input() {
        let dir = TempDir::new().unwrap();
        let mut paths = transitive_corpus(&dir);
        paths.push(dir.path().join("missing.jsonl"));

        let err = Alignment::open(&paths, AlignmentConfig::default()).unwrap_err();
        assert!(err.to_string().contains("missing.jsonl"));
    }
}
