use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use roxmltree::{Document, Node};

use crate::cli::Track;
use crate::model::{Polarity, Stance, Topic};

/// Parses a track topics file into a map keyed by topic number.
///
/// Each track uses its own child-tag vocabulary; everything is normalized
/// into the same [`Topic`] shape so downstream code never branches on the
/// year again. The map is read-only for the rest of the run.
pub fn load_topics(path: &Path, track: Track) -> Result<BTreeMap<u32, Topic>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc = Document::parse(&raw)
        .with_context(|| format!("failed to parse topics xml: {}", path.display()))?;

    let mut topics = BTreeMap::new();
    for node in doc
        .descendants()
        .filter(|node| node.has_tag_name("topic"))
    {
        let topic = parse_topic(node, track)
            .with_context(|| format!("invalid topic element in {}", path.display()))?;
        topics.insert(topic.number, topic);
    }

    if topics.is_empty() {
        bail!("no <topic> elements found in {}", path.display());
    }

    Ok(topics)
}

fn parse_topic(node: Node<'_, '_>, track: Track) -> Result<Topic> {
    let number = child_text(node, "number")
        .context("missing <number>")?
        .trim()
        .parse::<u32>()
        .context("invalid <number>")?;

    let stance_tag = match track {
        Track::Y2020 | Track::Y2022 => "answer",
        Track::Y2021 => "stance",
    };
    let stance_label = child_text(node, stance_tag)
        .with_context(|| format!("topic {number} missing <{stance_tag}>"))?;
    let stance = parse_stance(stance_label.trim(), track)
        .with_context(|| format!("topic {number} has invalid <{stance_tag}>"))?;

    let (title, description, narrative) = match track {
        Track::Y2020 => (
            child_text(node, "title").unwrap_or_default(),
            child_text(node, "description").unwrap_or_default(),
            child_text(node, "narrative").unwrap_or_default(),
        ),
        Track::Y2021 => (
            child_text(node, "query").unwrap_or_default(),
            child_text(node, "description").unwrap_or_default(),
            child_text(node, "narrative").unwrap_or_default(),
        ),
        Track::Y2022 => (
            child_text(node, "query").unwrap_or_default(),
            child_text(node, "question").unwrap_or_default(),
            child_text(node, "background").unwrap_or_default(),
        ),
    };

    Ok(Topic {
        number,
        title,
        description,
        narrative,
        evidence: child_text(node, "evidence").unwrap_or_default(),
        disclaimer: child_text(node, "disclaimer"),
        stance,
    })
}

fn parse_stance(label: &str, track: Track) -> Result<Stance> {
    let polarity = match (track, label) {
        (Track::Y2020 | Track::Y2022, "yes") => Polarity::Positive,
        (Track::Y2020 | Track::Y2022, "no") => Polarity::Negative,
        (Track::Y2021, "helpful") => Polarity::Positive,
        (Track::Y2021, "unhelpful") => Polarity::Negative,
        _ => bail!("unrecognized answer/stance label: {label}"),
    };

    Ok(Stance {
        label: label.to_string(),
        polarity,
    })
}

fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
}

/// Per-topic text substitutions applied when re-emitting a topics file.
#[derive(Debug, Clone, Default)]
pub struct TopicOverrides {
    pub description: Option<String>,
    pub narrative: Option<String>,
}

/// Re-emits a topics file in the track's own tag layout, substituting the
/// generated description (query variant) and/or narrative where provided.
pub fn render_topics_xml(
    track: Track,
    topics: &BTreeMap<u32, Topic>,
    overrides: &BTreeMap<u32, TopicOverrides>,
) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<topics>\n");

    for topic in topics.values() {
        let slot = overrides.get(&topic.number);
        let description = slot
            .and_then(|s| s.description.as_deref())
            .unwrap_or(&topic.description);
        let narrative = slot
            .and_then(|s| s.narrative.as_deref())
            .unwrap_or(&topic.narrative);
        let disclaimer = topic.disclaimer.as_deref().unwrap_or_default();

        out.push_str("\t<topic>\n");
        push_tag(&mut out, "number", &topic.number.to_string());
        match track {
            Track::Y2020 => {
                push_tag(&mut out, "title", &topic.title);
                push_tag(&mut out, "description", description);
                push_tag(&mut out, "answer", &topic.stance.label);
                push_tag(&mut out, "evidence", &topic.evidence);
                push_tag(&mut out, "narrative", narrative);
            }
            Track::Y2021 => {
                push_tag(&mut out, "query", &topic.title);
                push_tag(&mut out, "description", description);
                push_tag(&mut out, "narrative", narrative);
                push_tag(&mut out, "disclaimer", disclaimer);
                push_tag(&mut out, "stance", &topic.stance.label);
                push_tag(&mut out, "evidence", &topic.evidence);
            }
            Track::Y2022 => {
                push_tag(&mut out, "question", description);
                push_tag(&mut out, "query", &topic.title);
                push_tag(&mut out, "background", narrative);
                push_tag(&mut out, "disclaimer", disclaimer);
                push_tag(&mut out, "answer", &topic.stance.label);
                push_tag(&mut out, "evidence", &topic.evidence);
            }
        }
        out.push_str("\t</topic>\n");
    }

    out.push_str("</topics>\n");
    out
}

fn push_tag(out: &mut String, tag: &str, text: &str) {
    out.push_str("\t\t<");
    out.push_str(tag);
    out.push('>');
    out.push_str(&escape_xml(text));
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write xml");
        file
    }

    #[test]
    fn loads_2021_topics_with_stance_polarity() {
        let file = write_temp(
            r#"<topics>
  <topic>
    <number>101</number>
    <query>ankle sprain heat</query>
    <description>Should I apply heat to an ankle sprain?</description>
    <narrative>Heat versus ice.</narrative>
    <disclaimer>Not medical advice.</disclaimer>
    <stance>unhelpful</stance>
    <evidence>https://example.org</evidence>
  </topic>
</topics>"#,
        );

        let topics = load_topics(file.path(), Track::Y2021).expect("parse");
        let topic = topics.get(&101).expect("topic 101");
        assert_eq!(topic.title, "ankle sprain heat");
        assert_eq!(topic.stance.label, "unhelpful");
        assert_eq!(topic.stance.polarity, Polarity::Negative);
        assert_eq!(topic.disclaimer.as_deref(), Some("Not medical advice."));
    }

    #[test]
    fn loads_2020_topics_and_rejects_bad_answer() {
        let file = write_temp(
            r#"<topics>
  <topic>
    <number>1</number>
    <title>acv wound</title>
    <description>Can vinegar treat wounds?</description>
    <answer>maybe</answer>
    <evidence>e</evidence>
    <narrative>n</narrative>
  </topic>
</topics>"#,
        );

        let err = load_topics(file.path(), Track::Y2020).unwrap_err();
        assert!(format!("{err:#}").contains("invalid <answer>"));
    }

    #[test]
    fn maps_2022_question_and_background_fields() {
        let file = write_temp(
            r#"<topics>
  <topic>
    <number>151</number>
    <query>tepid sponge bath fever</query>
    <question>Can a tepid sponge bath reduce fever?</question>
    <background>Common home remedy.</background>
    <disclaimer>d</disclaimer>
    <answer>yes</answer>
    <evidence>e</evidence>
  </topic>
</topics>"#,
        );

        let topics = load_topics(file.path(), Track::Y2022).expect("parse");
        let topic = topics.get(&151).expect("topic 151");
        assert_eq!(topic.description, "Can a tepid sponge bath reduce fever?");
        assert_eq!(topic.narrative, "Common home remedy.");
        assert_eq!(topic.stance.polarity, Polarity::Positive);
    }

    #[test]
    fn renders_round_trippable_xml_with_overrides() {
        let file = write_temp(
            r#"<topics>
  <topic>
    <number>5</number>
    <title>t</title>
    <description>original question</description>
    <answer>no</answer>
    <evidence>e</evidence>
    <narrative>n</narrative>
  </topic>
</topics>"#,
        );
        let topics = load_topics(file.path(), Track::Y2020).expect("parse");

        let mut overrides = BTreeMap::new();
        overrides.insert(
            5,
            TopicOverrides {
                description: Some("variant <one> & two".to_string()),
                narrative: None,
            },
        );

        let rendered = render_topics_xml(Track::Y2020, &topics, &overrides);
        assert!(rendered.contains("<description>variant &lt;one&gt; &amp; two</description>"));

        let reparsed_file = write_temp(&rendered);
        let reparsed = load_topics(reparsed_file.path(), Track::Y2020).expect("reparse");
        assert_eq!(reparsed.get(&5).unwrap().description, "variant <one> & two");
    }
}
