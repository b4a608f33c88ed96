// StockSync - core/processor.rs
//
// Static catalogue of the backend transformations offered on the
// Processors page: which input slots each one needs, the multipart field
// each slot is uploaded as, and the endpoint it posts to.

use crate::core::model::{accepts_extension, InputFile};
use crate::util::constants;
use std::path::Path;

/// One required input file of a processor or analytics group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSlot {
    /// Slot identifier, unique within its processor.
    pub id: &'static str,

    /// Translation key of the drop-zone label.
    pub label_key: &'static str,

    /// Multipart form field the file is uploaded as.
    pub field: &'static str,

    /// Accepted extensions (lowercase, no dot). Empty accepts anything.
    pub accept: &'static [&'static str],
}

impl InputSlot {
    /// Whether `path` has one of the accepted extensions.
    pub fn accepts(&self, path: &Path) -> bool {
        accepts_extension(path, self.accept)
    }
}

/// The backend transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    /// ME2N purchase orders merged with eBM/Lotus requests.
    GlobalOrders,
    /// MB52 stock split per storage location.
    Mb52,
    /// MB51 material movements with reversals reconciled.
    Mb51,
}

impl ProcessorKind {
    pub fn all() -> &'static [ProcessorKind] {
        &[Self::GlobalOrders, Self::Mb52, Self::Mb51]
    }

    /// Stable identifier recorded in the job ledger.
    pub fn key(&self) -> &'static str {
        match self {
            Self::GlobalOrders => "global-orders",
            Self::Mb52 => "mb52",
            Self::Mb51 => "mb51",
        }
    }

    pub fn title_key(&self) -> &'static str {
        match self {
            Self::GlobalOrders => "processors.globalOrders.title",
            Self::Mb52 => "processors.mb52.title",
            Self::Mb51 => "processors.mb51.title",
        }
    }

    pub fn description_key(&self) -> &'static str {
        match self {
            Self::GlobalOrders => "processors.globalOrders.description",
            Self::Mb52 => "processors.mb52.description",
            Self::Mb51 => "processors.mb51.description",
        }
    }

    /// Backend endpoint path.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::GlobalOrders => "/processors/global_orders",
            Self::Mb52 => "/processors/mb52",
            Self::Mb51 => "/processors/mb51",
        }
    }

    /// Required input slots, in upload order.
    pub fn slots(&self) -> Vec<InputSlot> {
        let accept = constants::SPREADSHEET_EXTENSIONS;
        match self {
            Self::GlobalOrders => vec![
                InputSlot {
                    id: "me2n",
                    label_key: "processors.globalOrders.file1Label",
                    field: "me2n_file",
                    accept,
                },
                InputSlot {
                    id: "ebm",
                    label_key: "processors.globalOrders.file2Label",
                    field: "ebm_file",
                    accept,
                },
            ],
            Self::Mb52 => vec![InputSlot {
                id: "mb52",
                label_key: "processors.mb52.file1Label",
                field: "file",
                accept,
            }],
            Self::Mb51 => vec![InputSlot {
                id: "mb51",
                label_key: "processors.mb51.file1Label",
                field: "file",
                accept,
            }],
        }
    }

    /// Whether the card shows the movement-type selector.
    pub fn takes_movement_type(&self) -> bool {
        matches!(self, Self::Mb51)
    }
}

/// Everything the backend needs to run one job.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub kind: ProcessorKind,

    /// `(multipart field, file)` pairs in slot order.
    pub files: Vec<(&'static str, InputFile)>,

    /// MB51 only: the reversal movement type (102 or 122).
    pub movement_type: Option<u16>,
}

impl ProcessRequest {
    pub fn new(kind: ProcessorKind, files: Vec<(&'static str, InputFile)>) -> Self {
        Self {
            kind,
            files,
            movement_type: None,
        }
    }

    pub fn with_movement_type(mut self, movement_type: u16) -> Self {
        self.movement_type = Some(movement_type);
        self
    }
}
