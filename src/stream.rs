/// Line-by-line processing of decoder output into metric updates
use log::{debug, error, info};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::decoder::decode_observation;
use crate::error::{ExporterError, Result};
use crate::location::LocationTable;
use crate::models::{LabelTuple, Observation};
use crate::telemetry::MetricSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Running,
    /// Input closed cleanly
    Drained,
    /// Stopped on the first decode or read error
    Failed,
}

/// Drives decode -> resolve -> emit for every line of an input stream
///
/// Processing is fail-fast: the first malformed line or read error ends the
/// stream. Metrics for lines before the failure stay recorded.
pub struct StreamProcessor<'a, S: MetricSink> {
    table: &'a LocationTable,
    sink: &'a S,
    state: StreamState,
    lines_processed: u64,
}

impl<'a, S: MetricSink> StreamProcessor<'a, S> {
    pub fn new(table: &'a LocationTable, sink: &'a S) -> Self {
        Self {
            table,
            sink,
            state: StreamState::Running,
            lines_processed: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn lines_processed(&self) -> u64 {
        self.lines_processed
    }

    /// Consume `reader` until end of input or the first error
    ///
    /// Returns the number of lines turned into metric updates. A processor
    /// runs once: calling this again after it drained or failed is an error.
    pub async fn run<R>(&mut self, reader: R) -> Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.state != StreamState::Running {
            return Err(ExporterError::StreamFinished(format!("{:?}", self.state)));
        }

        let mut lines = reader.lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.state = StreamState::Drained;
                    info!(
                        "Decoder output closed after {} lines",
                        self.lines_processed
                    );
                    break;
                }
                Err(e) => {
                    self.state = StreamState::Failed;
                    error!("Failed to read decoder output: {}", e);
                    return Err(ExporterError::Input(e));
                }
            };

            let line_number = self.lines_processed + 1;
            let observation = match decode_observation(&line) {
                Ok(observation) => observation,
                Err(e) => {
                    self.state = StreamState::Failed;
                    error!("Failed to decode line {}: {}", line_number, e);
                    return Err(ExporterError::Decode {
                        line: line_number,
                        source: e,
                    });
                }
            };

            let labels = self.table.resolve_labels(&observation);
            debug!(
                "{} model={} id={} channel={} location='{}'",
                observation.time, labels.model, labels.id, labels.channel, labels.location
            );
            emit(self.sink, &labels, &observation);
            self.lines_processed = line_number;
        }

        Ok(self.lines_processed)
    }
}

/// Push one observation's updates to the sink
fn emit<S: MetricSink>(sink: &S, labels: &LabelTuple, observation: &Observation) {
    sink.increment_packet_count(labels);
    sink.set_timestamp_to_now(labels);
    if let Some(celsius) = observation.temperature {
        sink.set_temperature(labels, celsius);
    }
    if let Some(fraction) = observation.humidity_fraction {
        sink.set_humidity(labels, fraction);
    }
    if let Some(value) = observation.battery.gauge_value() {
        sink.set_battery(labels, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::location::{LocationMatcher, MatcherKind};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkCall {
        Packet(LabelTuple),
        Timestamp(LabelTuple),
        Temperature(LabelTuple, f64),
        Humidity(LabelTuple, f64),
        Battery(LabelTuple, f64),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<SinkCall>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: SinkCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl MetricSink for RecordingSink {
        fn increment_packet_count(&self, labels: &LabelTuple) {
            self.push(SinkCall::Packet(labels.clone()));
        }

        fn set_timestamp_to_now(&self, labels: &LabelTuple) {
            self.push(SinkCall::Timestamp(labels.clone()));
        }

        fn set_temperature(&self, labels: &LabelTuple, celsius: f64) {
            self.push(SinkCall::Temperature(labels.clone(), celsius));
        }

        fn set_humidity(&self, labels: &LabelTuple, fraction: f64) {
            self.push(SinkCall::Humidity(labels.clone(), fraction));
        }

        fn set_battery(&self, labels: &LabelTuple, value: f64) {
            self.push(SinkCall::Battery(labels.clone(), value));
        }
    }

    const NEXUS_LINE: &str = r#"{"time":"2019-05-23 20:41:45","model":"Nexus-TH","id":94,"channel":1,"battery":"OK","temperature_C":22.6,"humidity":53}"#;

    fn nexus_labels(location: &str) -> LabelTuple {
        LabelTuple {
            model: "Nexus-TH".to_string(),
            id: "94".to_string(),
            channel: "1".to_string(),
            location: location.to_string(),
        }
    }

    #[tokio::test]
    async fn emits_all_metrics_for_a_reading() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input = format!("{}\n", NEXUS_LINE);

        let mut processor = StreamProcessor::new(&table, &sink);
        let processed = processor.run(input.as_bytes()).await.unwrap();

        assert_eq!(processed, 1);
        assert_eq!(processor.state(), StreamState::Drained);
        let labels = nexus_labels("");
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Packet(labels.clone()),
                SinkCall::Timestamp(labels.clone()),
                SinkCall::Temperature(labels.clone(), 22.6),
                SinkCall::Humidity(labels.clone(), 0.53),
                SinkCall::Battery(labels, 1.0),
            ]
        );
    }

    #[tokio::test]
    async fn skips_absent_readings_and_unknown_battery() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input = r#"{"model":"Acurite-Rain","id":"7","channel":"A","battery":"weird"}"#;

        let mut processor = StreamProcessor::new(&table, &sink);
        processor.run(input.as_bytes()).await.unwrap();

        let labels = LabelTuple {
            model: "Acurite-Rain".to_string(),
            id: "7".to_string(),
            channel: "A".to_string(),
            location: String::new(),
        };
        assert_eq!(
            sink.calls(),
            vec![SinkCall::Packet(labels.clone()), SinkCall::Timestamp(labels)]
        );
    }

    #[tokio::test]
    async fn resolves_configured_location() {
        let table = LocationTable::new([LocationMatcher {
            kind: MatcherKind::Channel,
            model: "Nexus-TH".to_string(),
            value: "1".to_string(),
            location: "Garage".to_string(),
        }]);
        let sink = RecordingSink::default();

        let mut processor = StreamProcessor::new(&table, &sink);
        processor.run(NEXUS_LINE.as_bytes()).await.unwrap();

        assert_eq!(sink.calls()[0], SinkCall::Packet(nexus_labels("Garage")));
    }

    #[tokio::test]
    async fn stops_at_first_malformed_line() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input = format!(
            "{}\n{}\n{}\n",
            NEXUS_LINE, r#"{"model":"Nexus-TH","id":94,"#, NEXUS_LINE
        );

        let mut processor = StreamProcessor::new(&table, &sink);
        let err = processor.run(input.as_bytes()).await.unwrap_err();

        match err {
            ExporterError::Decode {
                line,
                source: DecodeError::MalformedJson(_),
            } => assert_eq!(line, 2),
            other => panic!("expected malformed JSON on line 2, got {:?}", other),
        }
        assert_eq!(processor.state(), StreamState::Failed);
        assert_eq!(processor.lines_processed(), 1);

        // Only the first line reached the sink
        let packets = sink
            .calls()
            .into_iter()
            .filter(|call| matches!(call, SinkCall::Packet(_)))
            .count();
        assert_eq!(packets, 1);
        assert_eq!(sink.calls().len(), 5);
    }

    #[tokio::test]
    async fn stops_on_unresolvable_channel() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input = r#"{"model":"Nexus-TH","id":94,"channel":[1]}"#;

        let mut processor = StreamProcessor::new(&table, &sink);
        let err = processor.run(input.as_bytes()).await.unwrap_err();

        assert!(matches!(
            err,
            ExporterError::Decode {
                line: 1,
                source: DecodeError::UnresolvableField { field: "channel", .. },
            }
        ));
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_utf8_is_an_input_error() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input: &[u8] = b"\xff\xfe\n";

        let mut processor = StreamProcessor::new(&table, &sink);
        let err = processor.run(input).await.unwrap_err();

        assert!(matches!(err, ExporterError::Input(_)));
        assert_eq!(processor.state(), StreamState::Failed);
    }

    #[tokio::test]
    async fn finished_processor_refuses_to_run_again() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();

        let mut failed = StreamProcessor::new(&table, &sink);
        assert!(failed.run(&b"{\n"[..]).await.is_err());
        assert_eq!(failed.state(), StreamState::Failed);
        assert!(matches!(
            failed.run(NEXUS_LINE.as_bytes()).await,
            Err(ExporterError::StreamFinished(_))
        ));
        assert_eq!(failed.state(), StreamState::Failed);

        let mut drained = StreamProcessor::new(&table, &sink);
        drained.run(&b""[..]).await.unwrap();
        assert!(matches!(
            drained.run(NEXUS_LINE.as_bytes()).await,
            Err(ExporterError::StreamFinished(_))
        ));
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_input_drains_cleanly() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();

        let mut processor = StreamProcessor::new(&table, &sink);
        let processed = processor.run(&b""[..]).await.unwrap();

        assert_eq!(processed, 0);
        assert_eq!(processor.state(), StreamState::Drained);
    }

    #[tokio::test]
    async fn identical_labels_accumulate_in_order() {
        let table = LocationTable::default();
        let sink = RecordingSink::default();
        let input = format!(
            "{}\n{}\n",
            NEXUS_LINE,
            r#"{"model":"Nexus-TH","id":"94","channel":"1","temperature_C":23.1}"#
        );

        let mut processor = StreamProcessor::new(&table, &sink);
        assert_eq!(processor.run(input.as_bytes()).await.unwrap(), 2);

        let temperatures: Vec<f64> = sink
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Temperature(labels, value) => {
                    assert_eq!(labels, nexus_labels(""));
                    Some(value)
                }
                _ => None,
            })
            .collect();
        assert_eq!(temperatures, vec![22.6, 23.1]);
    }
}
