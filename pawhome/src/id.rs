use nanoid::nanoid;

/// Canonical alphabet for pawhome record identifiers (no ambiguous glyphs).
const RECORD_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Random suffix length after the kind prefix.
const RECORD_ID_LENGTH: usize = 16;

/// The kinds of record that receive generated identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Listing,
    Request,
    Meeting,
    Document,
    Note,
    FollowUp,
}

impl RecordKind {
    /// Short prefix embedded in ids so sub-record ids are self-describing.
    pub const fn prefix(self) -> &'static str {
        match self {
            RecordKind::Listing => "lst",
            RecordKind::Request => "req",
            RecordKind::Meeting => "mtg",
            RecordKind::Document => "doc",
            RecordKind::Note => "note",
            RecordKind::FollowUp => "fup",
        }
    }
}

/// Generates a new record identifier, e.g. `mtg_KqwRtVbGHnJmXcPd`.
pub fn generate_record_id(kind: RecordKind) -> String {
    format!("{}_{}", kind.prefix(), nanoid!(RECORD_ID_LENGTH, RECORD_ID_ALPHABET))
}
