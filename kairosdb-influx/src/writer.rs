//! Publishing boundary between the parser and the time series sink

use parking_lot::Mutex;
use serde::Serialize;

use kairosdb_core::datapoint::DataPoint;
use kairosdb_core::error::{KairosError, KairosResult};
use kairosdb_core::tags::TagSet;

/// A data point ready for storage, as posted on the event bus
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPointEvent {
    pub metric_name: String,
    pub tags: TagSet,
    pub data_point: DataPoint,
}

/// Accepts `(name, tags, sample)` triples for publication
pub trait MetricWriter: Send + Sync {
    fn write(&self, name: &str, tags: &TagSet, data_point: &DataPoint) -> KairosResult<()>;
}

/// Posts events onto a flume channel drained by the storage side
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    sender: flume::Sender<DataPointEvent>,
}

impl ChannelWriter {
    pub fn new(sender: flume::Sender<DataPointEvent>) -> Self {
        Self { sender }
    }

    /// Create a writer together with the receiving end of its channel
    pub fn unbounded() -> (Self, flume::Receiver<DataPointEvent>) {
        let (sender, receiver) = flume::unbounded();
        (Self::new(sender), receiver)
    }
}

impl MetricWriter for ChannelWriter {
    fn write(&self, name: &str, tags: &TagSet, data_point: &DataPoint) -> KairosResult<()> {
        let event = DataPointEvent {
            metric_name: name.to_string(),
            tags: tags.clone(),
            data_point: data_point.clone(),
        };

        self.sender
            .send(event)
            .map_err(|_| KairosError::publish("Event bus is closed"))
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    events: Mutex<Vec<DataPointEvent>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn events(&self) -> Vec<DataPointEvent> {
        self.events.lock().clone()
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Vec<DataPointEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Events for one metric name
    pub fn events_named(&self, name: &str) -> Vec<DataPointEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.metric_name == name)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl MetricWriter for MemoryWriter {
    fn write(&self, name: &str, tags: &TagSet, data_point: &DataPoint) -> KairosResult<()> {
        self.events.lock().push(DataPointEvent {
            metric_name: name.to_string(),
            tags: tags.clone(),
            data_point: data_point.clone(),
        });
        Ok(())
    }
}
