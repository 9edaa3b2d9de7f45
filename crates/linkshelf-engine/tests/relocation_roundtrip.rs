use linkshelf_engine::{
    Classified, EditOp, KeywordRule, KeywordTable, LinkRef, OffsetTracker, Outline, Resolver,
    apply_batch, plan_batch,
};
use pretty_assertions::assert_eq;

const DOC: &str = "\
# Shipbuilding

https://example.com/welding-course

# Machine Learning

# Unsorted

https://example.com/hull-design
https://example.com/transformer-guide
https://example.com/mystery-blog
";

fn outline(text: &str) -> Outline {
    Outline::from_bytes(text.as_bytes(), "Unsorted").unwrap()
}

fn resolver() -> Resolver {
    let table = KeywordTable::new(vec![
        KeywordRule {
            heading: "Shipbuilding".into(),
            keywords: vec!["ship".into(), "hull".into(), "welding".into()],
        },
        KeywordRule {
            heading: "Machine Learning".into(),
            keywords: vec!["machine learning".into(), "model".into()],
        },
    ]);
    Resolver::new(table, Resolver::DEFAULT_THRESHOLD)
}

fn classified(o: &Outline, url: &str, raw: &str, annotation: &str) -> Classified {
    let link = o
        .links()
        .iter()
        .position(|l| l.url == url)
        .unwrap_or_else(|| panic!("no link {url}"));
    Classified {
        link: LinkRef(link),
        raw_category: raw.into(),
        annotation: annotation.into(),
    }
}

fn reorganized() -> String {
    let o = outline(DOC);
    let batch = vec![
        classified(
            &o,
            "https://example.com/hull-design",
            "ship construction basics",
            "Plate layout patterns for small hulls.",
        ),
        classified(
            &o,
            "https://example.com/transformer-guide",
            "machine learning, deep learning",
            "Walkthrough of attention internals.",
        ),
        classified(&o, "https://example.com/mystery-blog", "xyz-nonsense", ""),
    ];
    let plan = plan_batch(&o, &resolver(), &batch).unwrap();
    assert_eq!(plan.moved, 2);
    apply_batch(o.text(), &plan.ops).unwrap()
}

#[test]
fn relocation_round_trip() {
    let result = reorganized();

    // Exactly one link line followed by one annotation line under each
    // target heading, and no residue in the unsorted section.
    assert_eq!(
        result,
        "\
# Shipbuilding

https://example.com/welding-course
https://example.com/hull-design
Plate layout patterns for small hulls.

# Machine Learning
https://example.com/transformer-guide
Walkthrough of attention internals.

# Unsorted

https://example.com/mystery-blog
"
    );
}

#[test]
fn reorganized_document_snapshot() {
    insta::assert_snapshot!(reorganized());
}

#[test]
fn replanning_an_organized_document_is_empty() {
    let result = reorganized();
    let o = outline(&result);

    // Same classifications against the rewritten document: every link now
    // sits under its resolved heading.
    let batch = vec![
        classified(
            &o,
            "https://example.com/hull-design",
            "ship construction basics",
            "Plate layout patterns for small hulls.",
        ),
        classified(
            &o,
            "https://example.com/transformer-guide",
            "machine learning, deep learning",
            "Walkthrough of attention internals.",
        ),
        classified(&o, "https://example.com/mystery-blog", "xyz-nonsense", ""),
    ];
    let plan = plan_batch(&o, &resolver(), &batch).unwrap();

    assert_eq!(plan.moved, 0);
    assert!(plan.ops.is_empty());
    assert_eq!(apply_batch(o.text(), &plan.ops).unwrap(), result);
}

#[test]
fn two_links_into_one_heading_append_in_order() {
    let o = outline(DOC);
    let batch = vec![
        classified(&o, "https://example.com/hull-design", "shipbuilding", "First note."),
        classified(&o, "https://example.com/mystery-blog", "shipbuilding", "Second note."),
    ];
    let plan = plan_batch(&o, &resolver(), &batch).unwrap();
    let result = apply_batch(o.text(), &plan.ops).unwrap();

    let ship_section = result
        .split("# Machine Learning")
        .next()
        .expect("shipbuilding section");
    let hull = ship_section.find("https://example.com/hull-design").unwrap();
    let mystery = ship_section.find("https://example.com/mystery-blog").unwrap();
    assert!(
        hull < mystery,
        "second relocated entry must append after the first"
    );
    assert!(ship_section.contains("First note.\nhttps://example.com/mystery-blog\nSecond note.\n"));
}

#[test]
fn planned_batches_translate_monotonically() {
    let o = outline(DOC);
    let batch = vec![
        classified(&o, "https://example.com/hull-design", "shipbuilding", "A."),
        classified(&o, "https://example.com/transformer-guide", "machine learning", "B."),
    ];
    let plan = plan_batch(&o, &resolver(), &batch).unwrap();

    // For every prefix of the batch, translation is non-decreasing over
    // the original offsets that remain valid.
    for prefix_len in 0..=plan.ops.len() {
        let mut tracker = OffsetTracker::new();
        for op in &plan.ops[..prefix_len] {
            tracker.record(op).unwrap();
        }
        let mut last = 0;
        for offset in 0..=o.len() {
            if let Ok(effective) = tracker.translate(offset) {
                assert!(
                    effective >= last,
                    "prefix {prefix_len}: translate({offset}) regressed"
                );
                last = effective;
            }
        }
    }
}

#[test]
fn unsorted_only_document_settles_to_itself() {
    let doc = "https://example.com/a\nhttps://example.com/b\n";
    let o = outline(doc);
    let batch: Vec<Classified> = o
        .links()
        .iter()
        .enumerate()
        .map(|(i, _)| Classified {
            link: LinkRef(i),
            raw_category: "anything at all".into(),
            annotation: String::new(),
        })
        .collect();
    let plan = plan_batch(&o, &resolver(), &batch).unwrap();

    assert!(plan.ops.is_empty());
    assert_eq!(apply_batch(doc, &plan.ops).unwrap(), doc);
}

#[test]
fn moving_upward_and_downward_in_one_batch() {
    // One link moves up the document, one moves down, exercising shifts in
    // both directions through the shared tracker.
    let doc = "\
# Alpha

# Unsorted

https://example.com/alpha-notes

# Zulu

https://example.com/misplaced
";
    let o = outline(doc);
    let table = KeywordTable::new(vec![
        KeywordRule {
            heading: "Alpha".into(),
            keywords: vec!["alpha".into()],
        },
        KeywordRule {
            heading: "Zulu".into(),
            keywords: vec!["zulu".into()],
        },
    ]);
    let resolver = Resolver::new(table, Resolver::DEFAULT_THRESHOLD);
    let batch = vec![
        classified(&o, "https://example.com/alpha-notes", "alpha things", "Up it goes."),
        classified(&o, "https://example.com/misplaced", "zulu things", ""),
    ];
    let plan = plan_batch(&o, &resolver, &batch).unwrap();
    assert_eq!(plan.moved, 1); // misplaced already sits under Zulu
    let result = apply_batch(doc, &plan.ops).unwrap();

    assert_eq!(
        result,
        "\
# Alpha
https://example.com/alpha-notes
Up it goes.

# Unsorted


# Zulu

https://example.com/misplaced
"
    );
}

#[test]
fn hand_built_overlapping_deletes_are_rejected() {
    let doc = "0123456789\n";
    let ops = vec![
        EditOp::DeleteRange { start: 2, end: 6 },
        EditOp::DeleteRange { start: 4, end: 8 },
    ];
    assert!(apply_batch(doc, &ops).is_err());
}
