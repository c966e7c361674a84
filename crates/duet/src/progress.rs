use crate::errors::PipelineError;
use crate::events::{DataEvent, OutputSink, ProgressAnnotation, ProgressStatus};
use crate::providers::base::Usage;

/// Progress reporting for one stage: an in-progress event when created, then exactly one
/// terminal event. Orders continue from the counter handed in.
pub struct StageProgress<'a> {
    sink: &'a dyn OutputSink,
    label: &'static str,
    counter: u32,
}

impl<'a> StageProgress<'a> {
    pub fn start(
        sink: &'a dyn OutputSink,
        label: &'static str,
        counter: u32,
        message: &str,
    ) -> Self {
        let counter = counter + 1;
        emit(sink, label, ProgressStatus::InProgress, counter, message);
        Self {
            sink,
            label,
            counter,
        }
    }

    /// Record success, returning the counter value the next stage continues from
    pub fn complete(self, message: &str) -> u32 {
        let order = self.counter + 1;
        emit(self.sink, self.label, ProgressStatus::Complete, order, message);
        order
    }

    pub fn fail(self, err: &PipelineError) -> u32 {
        let order = self.counter + 1;
        emit(
            self.sink,
            self.label,
            ProgressStatus::Error,
            order,
            &err.to_string(),
        );
        order
    }
}

fn emit(sink: &dyn OutputSink, label: &str, status: ProgressStatus, order: u32, message: &str) {
    sink.write_data(DataEvent::Progress(ProgressAnnotation {
        label: label.to_string(),
        status,
        order,
        message: message.to_string(),
        error: status == ProgressStatus::Error,
    }));
}

/// Attach the accumulated usage of a request as a message annotation
pub fn report_usage(sink: &dyn OutputSink, usage: Usage) {
    sink.write_annotation(DataEvent::Usage { value: usage });
}
