//! # Note Mapping Module
//!
//! Pure conversions from a frequency to the musical quantities the
//! visualizers need: note name, octave, cents offset, MIDI note number and the
//! angle on the tuning dial.
//!
//! ## Conventions
//! - Equal temperament with A4 = 440 Hz
//! - One full turn of the dial per octave, A at angle 0
//! - Note names use flats (`D♭`, `E♭`, ...)
//!
//! Every function here is total over `freq > 0`. Callers screen out the
//! "no pitch" sentinel before mapping.

use std::f64::consts::TAU;

/// Reference pitch for A4 in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI note number of A4.
pub const A4_MIDI_NOTE: i32 = 69;

/// Note names in chromatic order starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Display symbols matching `NOTE_NAMES`.
pub const NOTE_SYMBOLS: [&str; 12] = [
    "C", "D♭", "D", "E♭", "E", "F", "G♭", "G", "A♭", "A", "B♭", "B",
];

/// A note name plus the octave it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteName {
    /// Index into `NOTE_NAMES` (0 = C).
    pub note_index: usize,
    pub octave: i32,
}

impl NoteName {
    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.note_index]
    }

    pub fn symbol(&self) -> &'static str {
        NOTE_SYMBOLS[self.note_index]
    }
}

/// Everything the visualizers derive from a single frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCoordinate {
    pub note_index: usize,
    pub octave: i32,
    /// Offset from the nearest equal-tempered note, in (-50, 50].
    pub cents_offset: f32,
    /// Dial angle in radians, in [0, 2π).
    pub angle: f32,
}

fn octaves_from_a4(freq: f32) -> f64 {
    (freq as f64).log2() - A4_FREQUENCY.log2()
}

/// Folds a value onto [0, 1).
fn fract_positive(value: f64) -> f64 {
    let folded = ((value % 1.0) + 1.0) % 1.0;
    // (-tiny % 1.0) + 1.0 rounds to exactly 1.0
    if folded >= 1.0 { 0.0 } else { folded }
}

/// Returns the note whose bucket contains `rotation`.
///
/// The unit interval is split into 12 half-open buckets `(i/12 - 1/24,
/// i/12 + 1/24]`. A rotation sitting exactly on a boundary belongs to the
/// lower note. Rotations above the last bucket (just flat of the next C)
/// fall back to C.
pub fn note_index_for_rotation(rotation: f64) -> usize {
    (0..12)
        .find(|&i| {
            let low = (2 * i as i64 - 1) as f64 / 24.0;
            let high = (2 * i + 1) as f64 / 24.0;
            rotation > low && rotation <= high
        })
        .unwrap_or(0)
}

/// Maps a frequency to its note name and octave.
///
/// The octave is counted from A4, so it increments at each A. It rolls over
/// at the lower edge of the A bucket, so a slightly flat A still reports
/// the octave of the A it is nearest to.
pub fn freq_to_note(freq: f32) -> NoteName {
    let log_note = octaves_from_a4(freq);
    let octave = (log_note + 1.0 / 24.0).ceil() as i32 + 3;
    let rotation = fract_positive(log_note - 0.25);
    NoteName {
        note_index: note_index_for_rotation(rotation),
        octave,
    }
}

/// Maps a frequency to its angle on the tuning dial, in [0, 2π).
pub fn freq_to_angle(freq: f32) -> f32 {
    let angle = (fract_positive(octaves_from_a4(freq)) * TAU) as f32;
    // Narrowing to f32 can round a hair below 2π up to 2π.
    if angle >= std::f32::consts::TAU { 0.0 } else { angle }
}

/// Nearest MIDI note number. A frequency exactly halfway between two notes
/// resolves to the lower one, so the cents offset stays in (-50, 50].
pub fn note_from_frequency(freq: f32) -> i32 {
    let semitones = 12.0 * octaves_from_a4(freq) + A4_MIDI_NOTE as f64;
    (semitones - 0.5).ceil() as i32
}

/// Equal-tempered frequency of a MIDI note.
pub fn frequency_from_note(note: i32) -> f32 {
    (A4_FREQUENCY * 2f64.powf((note - A4_MIDI_NOTE) as f64 / 12.0)) as f32
}

/// Offset of `freq` from `note`, in cents.
pub fn cents_offset(freq: f32, note: i32) -> f32 {
    (1200.0 * (freq as f64 / frequency_from_note(note) as f64).log2()) as f32
}

/// Octave of a MIDI note in scientific pitch notation (C4 = 60).
pub fn octave_of_note(note: i32) -> i32 {
    note.div_euclid(12) - 1
}

/// Semitone position within the octave plus a fractional cents part, used
/// as the vertical coordinate of the timeline.
pub fn continuous_note(freq: f32) -> f32 {
    let note = note_from_frequency(freq);
    note.rem_euclid(12) as f32 + cents_offset(freq, note) / 100.0
}

pub fn note_coordinate(freq: f32) -> NoteCoordinate {
    let name = freq_to_note(freq);
    let note = note_from_frequency(freq);
    NoteCoordinate {
        note_index: name.note_index,
        octave: name.octave,
        cents_offset: cents_offset(freq, note),
        angle: freq_to_angle(freq),
    }
}

/// Display label for a note index; out-of-range indices wrap.
pub fn note_label(index: usize) -> &'static str {
    NOTE_SYMBOLS[index % 12]
}
