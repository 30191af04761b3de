use ci_type_sync_core::contract::MockRelationalSource;
use ci_type_sync_core::error::SourceError;
use ci_type_sync_core::memory_source::{InMemorySource, InclusionLink};
use ci_type_sync_core::model::{Group, GroupRow, Inclusion, Member, PatternRule, TypeRow};
use ci_type_sync_core::report::ReportBuilder;

fn member(index: usize) -> Member {
    Member {
        code: format!("TYPE{index}"),
        name: format!("Type {index}"),
        is_standard: if index % 2 == 0 { "Y" } else { "N" }.to_string(),
        is_deliverable: index % 3 != 0,
        row_id: None,
    }
}

fn group(index: usize) -> Group {
    Group {
        code: format!("GROUP{index}"),
        name: format!("Group {index}"),
        row_id: None,
    }
}

fn type_row(code: &str, name: &str, standard: &str, deliverable: &str) -> TypeRow {
    TypeRow {
        code: code.into(),
        name: name.into(),
        standard_label: standard.into(),
        deliverable_label: deliverable.into(),
        patterns: vec![],
        row_span: 1,
    }
}

/// Three groups, nine CI types; types 0-4 linked round-robin, 5-8 left ungrouped.
fn nine_types_source() -> InMemorySource {
    InMemorySource {
        locator_kinds: vec!["NXS".into()],
        groups: (0..3).map(group).collect(),
        members: (0..9).map(member).collect(),
        inclusions: (0..5)
            .map(|i| InclusionLink::new(format!("GROUP{}", i % 3), format!("TYPE{i}")))
            .collect(),
        pattern_rules: vec![],
    }
}

#[tokio::test]
async fn builds_groups_then_trailing_ungrouped_bucket() {
    let source = nine_types_source();
    let report = ReportBuilder::new(&source, "NXS")
        .build_report()
        .await
        .expect("report should build");

    let expected = vec![
        GroupRow {
            code: "GROUP0".into(),
            name: "Group 0".into(),
            types: vec![
                type_row("TYPE0", "Type 0", "Yes", "No"),
                type_row("TYPE3", "Type 3", "No", "No"),
            ],
            row_span: 2,
        },
        GroupRow {
            code: "GROUP1".into(),
            name: "Group 1".into(),
            types: vec![
                type_row("TYPE1", "Type 1", "No", "Yes"),
                type_row("TYPE4", "Type 4", "Yes", "Yes"),
            ],
            row_span: 2,
        },
        GroupRow {
            code: "GROUP2".into(),
            name: "Group 2".into(),
            types: vec![type_row("TYPE2", "Type 2", "Yes", "Yes")],
            row_span: 1,
        },
        GroupRow {
            code: "".into(),
            name: "".into(),
            types: vec![
                type_row("TYPE5", "Type 5", "No", "Yes"),
                type_row("TYPE6", "Type 6", "Yes", "No"),
                type_row("TYPE7", "Type 7", "No", "Yes"),
                type_row("TYPE8", "Type 8", "Yes", "Yes"),
            ],
            row_span: 4,
        },
    ];
    assert_eq!(report, expected);
    assert!(report.last().unwrap().is_ungrouped());
}

#[tokio::test]
async fn empty_source_yields_only_the_ungrouped_bucket() {
    let source = InMemorySource {
        locator_kinds: vec!["NXS".into()],
        ..Default::default()
    };
    let report = ReportBuilder::new(&source, "NXS").build_report().await.unwrap();

    assert_eq!(
        report,
        vec![GroupRow {
            code: "".into(),
            name: "".into(),
            types: vec![],
            row_span: 1,
        }]
    );
}

#[tokio::test]
async fn group_without_members_spans_one_row() {
    let mut source = nine_types_source();
    source.groups.push(group(7));

    let report = ReportBuilder::new(&source, "NXS").build_report().await.unwrap();

    let empty = report.iter().find(|g| g.code == "GROUP7").unwrap();
    assert!(empty.types.is_empty());
    assert_eq!(empty.row_span, 1);
    for row in &report {
        assert_eq!(row.row_span, row.types.len().max(1));
    }
}

#[tokio::test]
async fn member_linked_to_several_groups_appears_in_each_and_never_ungrouped() {
    let mut source = nine_types_source();
    source.inclusions.push(InclusionLink::new("GROUP2", "TYPE0"));

    let report = ReportBuilder::new(&source, "NXS").build_report().await.unwrap();

    let codes_in = |group: &str| -> Vec<String> {
        report
            .iter()
            .find(|g| g.code == group)
            .unwrap()
            .types
            .iter()
            .map(|t| t.code.clone())
            .collect()
    };
    assert_eq!(codes_in("GROUP0"), vec!["TYPE0", "TYPE3"]);
    assert_eq!(codes_in("GROUP2"), vec!["TYPE2", "TYPE0"]);
    assert!(!codes_in("").contains(&"TYPE0".to_string()));
}

#[tokio::test]
async fn patterns_skip_empty_and_foreign_locator_rules_in_source_order() {
    let mut source = nine_types_source();
    source.locator_kinds.push("GIT".into());
    let rule = |member: &str, kind: &str, pattern: Option<&str>| PatternRule {
        member_code: member.into(),
        locator_kind: kind.into(),
        pattern: pattern.map(String::from),
    };
    source.pattern_rules = vec![
        rule("TYPE0", "NXS", Some("the_reg_1")),
        rule("TYPE0", "NXS", Some("")),
        rule("TYPE0", "GIT", Some("not_for_nexus")),
        rule("TYPE0", "NXS", None),
        rule("TYPE1", "NXS", Some("other_type")),
        rule("TYPE0", "NXS", Some("the_reg_2")),
    ];

    let builder = ReportBuilder::new(&source, "NXS");
    let patterns = builder.patterns_for(&member(0)).await.unwrap();
    assert_eq!(patterns, vec!["the_reg_1", "the_reg_2"]);

    let row = builder.to_type_row(&member(0)).await.unwrap();
    assert_eq!(row.patterns, vec!["the_reg_1", "the_reg_2"]);
    assert_eq!(row.row_span, 1, "row span stays 1 regardless of pattern count");
}

#[tokio::test]
async fn standard_flag_is_yes_only_for_code_y() {
    let source = nine_types_source();
    let builder = ReportBuilder::new(&source, "NXS");

    let mut m = member(0);
    m.is_standard = "Y".into();
    m.is_deliverable = false;
    let row = builder.to_type_row(&m).await.unwrap();
    assert_eq!((row.standard_label.as_str(), row.deliverable_label.as_str()), ("Yes", "No"));

    m.is_standard = "y".into();
    m.is_deliverable = true;
    let row = builder.to_type_row(&m).await.unwrap();
    assert_eq!((row.standard_label.as_str(), row.deliverable_label.as_str()), ("No", "Yes"));
}

#[tokio::test]
async fn unknown_locator_kind_is_fatal() {
    let source = nine_types_source();
    let err = ReportBuilder::new(&source, "MISSING")
        .build_report()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::UnknownLocatorKind(kind) if kind == "MISSING"));
}

#[tokio::test]
async fn queries_inclusions_once_per_group_and_once_per_member() {
    let groups: Vec<Group> = (0..2).map(group).collect();
    let members: Vec<Member> = (0..3).map(member).collect();

    let mut source = MockRelationalSource::new();
    let all_groups = groups.clone();
    source
        .expect_groups()
        .times(1)
        .returning(move || Ok(all_groups.clone()));
    let all_members = members.clone();
    source
        .expect_members()
        .times(1)
        .returning(move || Ok(all_members.clone()));
    let linked = members[0].clone();
    source
        .expect_inclusions_by_group()
        .times(2)
        .returning(move |g: &Group| {
            if g.code == "GROUP0" {
                Ok(vec![Inclusion {
                    group_code: g.code.clone(),
                    member: linked.clone(),
                }])
            } else {
                Ok(vec![])
            }
        });
    let linked = members[0].clone();
    source
        .expect_inclusions_by_member()
        .times(3)
        .returning(move |m: &Member| {
            if m.code == linked.code {
                Ok(vec![Inclusion {
                    group_code: "GROUP0".into(),
                    member: m.clone(),
                }])
            } else {
                Ok(vec![])
            }
        });
    source
        .expect_pattern_rules()
        .times(3)
        .returning(|_, _| Ok(vec![]));

    let report = ReportBuilder::new(&source, "NXS").build_report().await.unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report[0].types.len(), 1);
    assert_eq!(report[1].row_span, 1);
    let ungrouped: Vec<_> = report[2].types.iter().map(|t| t.code.as_str()).collect();
    assert_eq!(ungrouped, vec!["TYPE1", "TYPE2"]);
}

#[tokio::test]
async fn source_errors_propagate_unchanged() {
    let mut source = MockRelationalSource::new();
    source
        .expect_groups()
        .returning(|| Err(SourceError::Backend("connection reset".into())));

    let err = ReportBuilder::new(&source, "NXS")
        .build_report()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Backend(_)));
    assert!(err.to_string().contains("connection reset"));
}
