//! Most recent output of each report

use std::collections::BTreeMap;

use anyhow::Result;

use super::ReportKind;

/// One slot per report kind; regeneration replaces the slot
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    outputs: BTreeMap<ReportKind, Vec<u8>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, kind: ReportKind, bytes: Vec<u8>) {
        self.outputs.insert(kind, bytes);
    }

    pub fn get(&self, kind: ReportKind) -> Option<&[u8]> {
        self.outputs.get(&kind).map(|b| b.as_slice())
    }

    /// Run `generate` and store its output; a failure leaves the slot untouched
    pub fn regenerate<F>(&mut self, kind: ReportKind, generate: F) -> Result<&[u8]>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        match generate() {
            Ok(bytes) => {
                self.put(kind, bytes);
                Ok(self.get(kind).unwrap_or_default())
            }
            Err(e) => {
                log::warn!("{} generation failed, keeping previous output", kind);
                Err(e)
            }
        }
    }

    /// The three outputs in report order, once all of them exist
    pub fn combined_inputs(&self) -> Option<[&[u8]; 3]> {
        Some([
            self.get(ReportKind::Attendance)?,
            self.get(ReportKind::Op1)?,
            self.get(ReportKind::Op2)?,
        ])
    }
}
