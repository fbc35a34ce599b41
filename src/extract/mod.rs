//! Record extraction from a raw response frame.
//!
//! The top level of the format is not strictly self-delimiting: between
//! `0x12`-tagged game sub-messages the operator emits framing bytes we do
//! not understand, so the extractor scans defensively one byte at a time
//! until the next game tag.

use tracing::{debug, trace, warn};

use crate::config::{
    DRIFT_MIN_FRAME_LEN, DRIFT_MIN_PARSE_RATIO, MAX_GAMES_PER_FRAME, STATIC_ASSET_PREFIX,
};
use crate::rtp::sign::to_sign;
use crate::types::{GameRecord, GameWindow};
use crate::wire::{varint, FieldReader, WireValue};

/// First two bytes of the 4-byte outer envelope (`0a 02 08 01` / `0a 02 08 02`).
const ENVELOPE_SIGNATURE: [u8; 2] = [0x0a, 0x02];

/// Tag byte for "repeated game": field 2, length-delimited.
const GAME_TAG: u8 = 0x12;

/// Extraction bookkeeping, used to tell "no games right now" apart from
/// suspected upstream format drift.
#[derive(Debug, Default)]
pub struct ExtractStats {
    pub frame_len: usize,
    /// `0x12`-tagged sub-messages encountered.
    pub attempted: usize,
    /// Sub-messages that yielded a valid (named) game record.
    pub parsed: usize,
    /// Records discarded by the game_name validity gate.
    pub dropped_unnamed: usize,
    pub drift_suspected: bool,
}

#[derive(Debug, Default)]
pub struct ExtractOutcome {
    pub games: Vec<GameRecord>,
    pub stats: ExtractStats,
}

/// Split a frame into game records. Truncated or malformed regions abort
/// only the extraction in progress; records parsed before that point are
/// returned, and nothing here ever propagates as a hard failure.
pub fn extract_games(frame: &[u8], window: GameWindow) -> ExtractOutcome {
    let mut games = Vec::new();
    let mut stats = ExtractStats { frame_len: frame.len(), ..Default::default() };

    let mut offset = 0usize;
    if frame.len() >= 4 && frame[..2] == ENVELOPE_SIGNATURE {
        offset = 4;
    }

    while offset < frame.len() {
        if frame[offset] != GAME_TAG {
            // Filler byte, the top level is not self-delimiting.
            offset += 1;
            continue;
        }
        offset += 1;

        let (len, consumed) = varint::decode(frame, offset);
        if consumed == 0 {
            break;
        }
        offset += consumed;

        // Compare before casting: the claimed length is attacker-controlled
        // and can sit near u64::MAX, where `offset + len` would wrap.
        if len == 0 || len > (frame.len() - offset) as u64 {
            // Truncated response: the sub-message claims more bytes than remain.
            break;
        }
        let len = len as usize;

        stats.attempted += 1;
        let record = parse_game_record(&frame[offset..offset + len]);
        if record.game_name.is_some() {
            games.push(record);
            stats.parsed += 1;
        } else {
            stats.dropped_unnamed += 1;
        }
        offset += len;

        if stats.parsed > MAX_GAMES_PER_FRAME {
            stats.drift_suspected = true;
            warn!(
                window = %window,
                parsed = stats.parsed,
                "frame exceeded sanity cap on records; suspecting schema drift"
            );
            break;
        }
    }

    if frame.len() >= DRIFT_MIN_FRAME_LEN {
        let ratio = if stats.attempted == 0 {
            0.0
        } else {
            stats.parsed as f64 / stats.attempted as f64
        };
        if stats.parsed == 0 || ratio < DRIFT_MIN_PARSE_RATIO {
            stats.drift_suspected = true;
            warn!(
                window = %window,
                frame_len = stats.frame_len,
                attempted = stats.attempted,
                parsed = stats.parsed,
                "non-trivial frame parsed poorly; suspecting schema drift"
            );
        }
    }

    debug!(
        window = %window,
        frame_len = stats.frame_len,
        parsed = stats.parsed,
        dropped = stats.dropped_unnamed,
        "frame extracted"
    );

    ExtractOutcome { games, stats }
}

/// Parse one game sub-message. Unmapped field/wire-type combinations are
/// read so the cursor keeps advancing, but their values are not stored.
pub fn parse_game_record(buf: &[u8]) -> GameRecord {
    let mut record = GameRecord::default();

    let mut reader = FieldReader::new(buf, 0);
    while let Some(field) = reader.next() {
        match (field.field_number, field.value) {
            (1, WireValue::Varint(v)) => {
                record.game_id = Some(v.to_string());
            }
            (2, WireValue::LengthDelimited(span)) => {
                record.game_name = Some(String::from_utf8_lossy(span).into_owned());
            }
            (3, WireValue::LengthDelimited(span)) => {
                record.provider = parse_provider_name(span);
            }
            (4, WireValue::LengthDelimited(span)) => {
                let s = String::from_utf8_lossy(span);
                if s.starts_with(STATIC_ASSET_PREFIX) {
                    record.image_path = Some(s.into_owned());
                }
            }
            (5, WireValue::Varint(v)) => {
                record.magnitude_bps = Some(v);
            }
            (6, WireValue::Varint(v)) => {
                // Sign arrives as an int64 encoded in an unsigned varint.
                record.sign = Some(to_sign(v));
            }
            (n, value @ WireValue::Fixed64(_)) => {
                trace!(field = n, value = value.as_f64(), "unmapped fixed64 field");
            }
            (n, value @ WireValue::Fixed32(_)) => {
                trace!(field = n, value = value.as_f32(), "unmapped fixed32 field");
            }
            _ => {}
        }
    }
    if let Some(halt) = reader.halt() {
        trace!(?halt, "record walk halted early");
    }

    record
}

/// Provider lives in field 2 of the nested message; first match wins.
pub fn parse_provider_name(buf: &[u8]) -> Option<String> {
    for field in FieldReader::new(buf, 0) {
        if let (2, WireValue::LengthDelimited(span)) = (field.field_number, &field.value) {
            return Some(String::from_utf8_lossy(span).into_owned());
        }
    }
    None
}
