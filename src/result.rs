#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarcodeFormat {
    Ean13,
    Ean8,
    UpcA,
    UpcE,
    Code128,
    Code39,
    Qr,
    DataMatrix,
    #[default]
    Other,
}

/// A decoded barcode and where it was found. `R` is the coordinate space of
/// the detector that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<R> {
    pub value: String,
    pub format: BarcodeFormat,
    pub bounds: R,
}

impl<R> Detection<R> {
    pub fn new(value: impl Into<String>, format: BarcodeFormat, bounds: R) -> Self {
        Self {
            value: value.into(),
            format,
            bounds,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub value: String,
    pub format: BarcodeFormat,
    /// Overlap ratio with the scan area, for frame analysis with a scan area.
    pub overlap: Option<f64>,
}
