//! WebVTT chapter track serialization.

use crate::chapter::{format_timestamp, ChapterCue};

/// Escape text for use inside a cue payload or note.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            // A line break inside a payload would end the cue.
            '\r' | '\n' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Render cues as a WebVTT chapters file.
///
/// A cue without an end time ends where the next cue starts; the last one
/// ends at `duration`. Each entry in `notes` becomes a `NOTE` block after the
/// header.
pub fn to_webvtt<S: AsRef<str>>(cues: &[ChapterCue], duration: f64, notes: &[S]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for note in notes {
        output.push_str(&format!("NOTE {}\n\n", escape(note.as_ref())));
    }

    for (i, cue) in cues.iter().enumerate() {
        let end = cue
            .end
            .or_else(|| cues.get(i + 1).map(|next| next.start))
            .unwrap_or(duration);

        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start),
            format_timestamp(end)
        ));
        output.push_str(&escape(&cue.title));
        output.push_str("\n\n");
    }

    output
}
