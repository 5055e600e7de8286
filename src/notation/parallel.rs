// Parallel music layout
// Rewrites a two-voice LilyPond document so matching bars of both voices sit side by side

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::bars::{bars, Bar};
use super::{NotationError, NotationResult};

/// Markers and names used when reading and writing the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterleaveOptions {
    /// Strings that open the two voice definitions in the converter output
    pub voice_markers: [String; 2],

    /// Start of the converter's score block, which closes the second voice
    pub score_marker: String,

    /// Variable names declared by `\parallelMusic`
    pub voice_ids: [String; 2],

    /// Staff names in the generated piano staff
    pub staff_names: [String; 2],

    /// Filler for a voice that runs out of bars (one full-measure rest)
    pub rest_placeholder: String,

    /// End-of-piece marker; its bar gets no number comment and no spacer line
    pub terminal_marker: String,

    /// Optional title block inserted after the header (also drops the tagline)
    pub title: Option<String>,
}

impl Default for InterleaveOptions {
    fn default() -> Self {
        InterleaveOptions {
            voice_markers: ["\"track1\"".to_string(), "\"track2\"".to_string()],
            score_marker: "\\score".to_string(),
            voice_ids: ["voiceA".to_string(), "voiceB".to_string()],
            staff_names: ["up".to_string(), "down".to_string()],
            rest_placeholder: "r1 |".to_string(),
            terminal_marker: "\\fine".to_string(),
            title: None,
        }
    }
}

/// A converter document cut into its header and the bodies of its two voices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceDocument<'a> {
    pub header: &'a str,
    pub voices: [&'a str; 2],
}

impl<'a> VoiceDocument<'a> {
    /// Locate the header and both voice bodies
    ///
    /// Fails with `MissingMarker` when the document does not have the expected
    /// two-voice shape.
    pub fn parse(content: &'a str, options: &InterleaveOptions) -> NotationResult<Self> {
        let find_marker = |marker: &String| {
            content
                .find(marker.as_str())
                .ok_or_else(|| NotationError::MissingMarker(format!("voice marker {}", marker)))
        };
        let starts = [
            find_marker(&options.voice_markers[0])?,
            find_marker(&options.voice_markers[1])?,
        ];

        let mut voices = [""; 2];
        for (i, &start) in starts.iter().enumerate() {
            let marker = &options.voice_markers[i];
            let body_start = content[start..]
                .find('{')
                .map(|offset| start + offset + 1)
                .ok_or_else(|| {
                    NotationError::MissingMarker(format!("opening brace after {}", marker))
                })?;

            let body_end = if i + 1 < starts.len() {
                starts[i + 1]
            } else {
                content[body_start..]
                    .find(options.score_marker.as_str())
                    .map(|offset| body_start + offset)
                    .ok_or_else(|| {
                        NotationError::MissingMarker(format!("score block {}", options.score_marker))
                    })?
            };

            if body_end < body_start {
                return Err(NotationError::MissingMarker(format!("body of voice {}", marker)));
            }

            let body = content[body_start..body_end].trim();
            voices[i] = body.strip_suffix('}').map(str::trim_end).unwrap_or(body);
        }

        Ok(VoiceDocument {
            header: content[..starts[0]].trim(),
            voices,
        })
    }
}

/// Build the `\parallelMusic` document
pub fn interleave(document: &VoiceDocument<'_>, options: &InterleaveOptions) -> String {
    let voices: Vec<Vec<Bar<'_>>> = document
        .voices
        .iter()
        .map(|voice| bars(voice).collect())
        .collect();
    let bar_count = voices.iter().map(Vec::len).max().unwrap_or(0);
    let marker = options.terminal_marker.as_str();

    let mut output = format!("{}\n", document.header);
    if let Some(title) = &options.title {
        output.push_str(&format!(
            "\\header {{\n  title = \"{}\"\n  tagline = ##f\n}}\n",
            title.replace('"', "\\\"")
        ));
    }
    output.push_str(&format!(
        "\\parallelMusic {},{} {{\n",
        options.voice_ids[0], options.voice_ids[1]
    ));

    let mut body = String::new();
    for i in 0..bar_count {
        let terminal = !marker.is_empty()
            && voices
                .iter()
                .any(|voice| voice.get(i).map(|bar| bar.contains_marker(marker)).unwrap_or(false));

        if !terminal {
            body.push_str(&format!("  %   bar {}\n", i + 1));
        }

        for voice in &voices {
            let text = voice
                .get(i)
                .map(|bar| bar.text)
                .unwrap_or(options.rest_placeholder.as_str());
            body.push_str(&format!("  {}\n", text));
        }

        if !terminal {
            body.push('\n');
        }
    }

    // The converter leaves the final bar open after the terminal marker
    if !marker.is_empty() {
        body = body.replace(&format!("{}\n", marker), &format!("{} |\n", marker));
    }
    output.push_str(&body);
    output.push_str("}\n");
    output.push_str(&score_block(options));

    log::info!(
        "Interleaved {} bars ({} + {})",
        bar_count,
        voices[0].len(),
        voices[1].len()
    );

    output
}

fn score_block(options: &InterleaveOptions) -> String {
    format!(
        "\\score {{\n  \\new PianoStaff <<\n    \\new Staff = \"{}\" {{ \\{} }}\n    \\new Staff = \"{}\" {{ \\{} }}\n  >>\n  \\layout {{}}\n  \\midi {{}}\n}}\n",
        options.staff_names[0], options.voice_ids[0], options.staff_names[1], options.voice_ids[1]
    )
}

/// `<stem>_parallel.<ext>` next to the input
pub fn parallel_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_parallel.{}", stem, ext.to_string_lossy()),
        None => format!("{}_parallel", stem),
    };
    input.with_file_name(name)
}

/// Read a converter document, interleave it, and write the result beside it
///
/// The input file is never modified. Returns the path of the new document.
pub fn transform_to_parallel(input: &Path, options: &InterleaveOptions) -> NotationResult<PathBuf> {
    if !input.is_file() {
        return Err(NotationError::NotFound(input.to_path_buf()));
    }

    let content = fs::read_to_string(input)?;
    let document = VoiceDocument::parse(&content, options)?;
    let output = interleave(&document, options);

    let output_path = parallel_output_path(input);
    fs::write(&output_path, output)?;

    log::info!("Wrote parallel notation to {}", output_path.display());
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONVERTED: &str = r#"\version "2.24.0"
\header { title = "Test" }

"track1" = {
  c''4 d'' e'' f'' | g''1 | c''1 \fine
}

"track2" = {
  c4 d e f | g1 |
}

\score {
  <<
    \new Staff \"track1"
    \new Staff \"track2"
  >>
}
"#;

    const EXPECTED: &str = r#"\version "2.24.0"
\header { title = "Test" }
\parallelMusic voiceA,voiceB {
  %   bar 1
  c''4 d'' e'' f'' |
  c4 d e f |

  %   bar 2
  g''1 |
  g1 |

  c''1 \fine |
  r1 |
}
\score {
  \new PianoStaff <<
    \new Staff = "up" { \voiceA }
    \new Staff = "down" { \voiceB }
  >>
  \layout {}
  \midi {}
}
"#;

    #[test]
    fn test_parse_document() {
        let doc = VoiceDocument::parse(CONVERTED, &InterleaveOptions::default()).unwrap();

        assert_eq!(doc.header, "\\version \"2.24.0\"\n\\header { title = \"Test\" }");
        assert_eq!(doc.voices[0], "c''4 d'' e'' f'' | g''1 | c''1 \\fine");
        assert_eq!(doc.voices[1], "c4 d e f | g1 |");
    }

    #[test]
    fn test_interleave_pads_shorter_voice() {
        let options = InterleaveOptions::default();
        let doc = VoiceDocument::parse(CONVERTED, &options).unwrap();

        assert_eq!(interleave(&doc, &options), EXPECTED);
    }

    #[test]
    fn test_interleave_keeps_existing_terminal_delimiter() {
        let doc = VoiceDocument {
            header: "\\version \"2.24.0\"",
            voices: ["c1 | d1 \\fine |", "e1 | f1 |"],
        };
        let output = interleave(&doc, &InterleaveOptions::default());

        assert!(output.contains("  d1 \\fine |\n  f1 |\n}\n"));
        assert!(!output.contains("\\fine | |"));
        assert!(!output.contains("bar 2"));
    }

    #[test]
    fn test_interleave_without_terminal_marker_numbers_every_bar() {
        let doc = VoiceDocument {
            header: "",
            voices: ["a1 | b1 |", "c1 |"],
        };
        let output = interleave(&doc, &InterleaveOptions::default());

        assert!(output.contains("  %   bar 1\n  a1 |\n  c1 |\n\n"));
        assert!(output.contains("  %   bar 2\n  b1 |\n  r1 |\n\n}"));
    }

    #[test]
    fn test_title_block() {
        let options = InterleaveOptions {
            title: Some("Clair \"de\" Lune".to_string()),
            ..Default::default()
        };
        let doc = VoiceDocument::parse(CONVERTED, &options).unwrap();
        let output = interleave(&doc, &options);

        assert!(output.contains("  title = \"Clair \\\"de\\\" Lune\"\n  tagline = ##f\n"));
    }

    #[test]
    fn test_missing_voice_marker() {
        let content = CONVERTED.replace("\"track2\" =", "\"other\" =");
        let result = VoiceDocument::parse(&content, &InterleaveOptions::default());
        assert!(matches!(result, Err(NotationError::MissingMarker(_))));
    }

    #[test]
    fn test_interleave_pads_upper_voice_when_it_ends_first() {
        let doc = VoiceDocument {
            header: "",
            voices: ["a1 |", "b1 | c1 | d1 \\fine"],
        };
        let output = interleave(&doc, &InterleaveOptions::default());

        assert!(output.contains("  %   bar 1\n  a1 |\n  b1 |\n\n"));
        assert!(output.contains("  %   bar 2\n  r1 |\n  c1 |\n\n  r1 |\n  d1 \\fine |\n}\n"));
        assert!(!output.contains("bar 3"));
    }

    #[test]
    fn test_voice_markers_out_of_order() {
        let content = CONVERTED
            .replace("\"track1\" =", "\"swap\" =")
            .replace("\"track2\" =", "\"track1\" =")
            .replace("\"swap\" =", "\"track2\" =");
        let result = VoiceDocument::parse(&content, &InterleaveOptions::default());

        match result {
            Err(NotationError::MissingMarker(message)) => assert!(message.contains("body of voice")),
            other => panic!("expected MissingMarker, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_score_block() {
        let content = CONVERTED.replace("\\score", "\\book");
        let result = VoiceDocument::parse(&content, &InterleaveOptions::default());
        assert!(matches!(result, Err(NotationError::MissingMarker(_))));
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            parallel_output_path(Path::new("/tmp/run/3_lilypond.ly")),
            PathBuf::from("/tmp/run/3_lilypond_parallel.ly")
        );
        assert_eq!(
            parallel_output_path(Path::new("score")),
            PathBuf::from("score_parallel")
        );
    }

    #[test]
    fn test_transform_writes_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("3_lilypond.ly");
        fs::write(&input, CONVERTED).unwrap();

        let output = transform_to_parallel(&input, &InterleaveOptions::default()).unwrap();

        assert_eq!(output, temp_dir.path().join("3_lilypond_parallel.ly"));
        assert_eq!(fs::read_to_string(&output).unwrap(), EXPECTED);
        assert_eq!(fs::read_to_string(&input).unwrap(), CONVERTED);
    }

    #[test]
    fn test_transform_distinguishes_missing_file_from_bad_format() {
        let temp_dir = TempDir::new().unwrap();

        let missing = transform_to_parallel(
            &temp_dir.path().join("nope.ly"),
            &InterleaveOptions::default(),
        );
        assert!(matches!(missing, Err(NotationError::NotFound(_))));

        let bad = temp_dir.path().join("bad.ly");
        fs::write(&bad, "\\version \"2.24.0\"\n{ c1 }\n").unwrap();
        let malformed = transform_to_parallel(&bad, &InterleaveOptions::default());
        assert!(matches!(malformed, Err(NotationError::MissingMarker(_))));
    }
}
