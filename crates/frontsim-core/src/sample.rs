//! Sample and its wire record
//!
//! One JSON object per line. Field order and the `true`/`false` literals are
//! part of the contract with consumers that match on text:
//!
//! ```text
//! {"t_us":0,"channel":2,"adc_x":1803,"adc_gtop":1950,"adc_gbot":1701,
//!  "flags":{"trg_x":false,"trg_g":true,"no_data":false,"is_g_event":false}}
//! ```

use crate::error::DeliveryError;
use serde::Serialize;
use std::io::Write;

/// A single synthesized detector reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp_us: i64,
    pub channel: usize,
    pub adc_x: u16,
    pub adc_gtop: u16,
    pub adc_gbot: u16,
    pub trg_x: bool,
    pub trg_g: bool,
    pub no_data: bool,
    pub is_g_event: bool,
}

#[derive(Serialize)]
struct WireRecord {
    t_us: i64,
    channel: usize,
    adc_x: u16,
    adc_gtop: u16,
    adc_gbot: u16,
    flags: WireFlags,
}

#[derive(Serialize)]
struct WireFlags {
    trg_x: bool,
    trg_g: bool,
    no_data: bool,
    is_g_event: bool,
}

impl From<&Sample> for WireRecord {
    fn from(s: &Sample) -> Self {
        Self {
            t_us: s.timestamp_us,
            channel: s.channel,
            adc_x: s.adc_x,
            adc_gtop: s.adc_gtop,
            adc_gbot: s.adc_gbot,
            flags: WireFlags {
                trg_x: s.trg_x,
                trg_g: s.trg_g,
                no_data: s.no_data,
                is_g_event: s.is_g_event,
            },
        }
    }
}

impl Sample {
    /// Write the compact record followed by `\n`.
    pub fn write_line<W: Write>(&self, mut writer: W) -> Result<(), DeliveryError> {
        serde_json::to_writer(&mut writer, &WireRecord::from(self))?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// The newline-terminated record as bytes.
    pub fn to_line(&self) -> Result<Vec<u8>, DeliveryError> {
        let mut line = Vec::with_capacity(160);
        self.write_line(&mut line)?;
        Ok(line)
    }
}
