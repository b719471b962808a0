//! End-to-end pipeline tests
//!
//! Runs fetch, scoring, outlier detection, user resolution, flagged-account
//! persistence and profiling against an in-memory wiki.

use chrono::{Duration, TimeZone, Utc};
use revsleuth::cache::FlaggedAccounts;
use revsleuth::history::EditFetcher;
use revsleuth::metrics::{AccountCache, AnonMetric, MetricRegistry};
use revsleuth::models::{SetKey, YearMonth};
use revsleuth::pipeline::Analyzer;
use revsleuth::profile::ProfileBuilder;
use revsleuth::wiki::{CompareResponse, MemoryWiki, RevisionRecord, UserInfo};
use std::sync::Arc;

/// Add a page whose revisions chain through parent ids, with one diff per
/// non-initial revision. `editors` are (username, userid) in chronological
/// order.
fn add_page(
    wiki: MemoryWiki,
    title: &str,
    first_revid: u64,
    month: u32,
    editors: &[(&str, i64)],
) -> MemoryWiki {
    let start = Utc.with_ymd_and_hms(2021, month, 1, 12, 0, 0).unwrap();
    let mut wiki = wiki;
    let mut revisions = Vec::new();
    for (i, (user, userid)) in editors.iter().enumerate() {
        let revid = first_revid + i as u64;
        let parentid = if i == 0 { 0 } else { revid - 1 };
        let size = 100 + 10 * i as i64;
        revisions.push(RevisionRecord {
            revid,
            parentid,
            user: Some(user.to_string()),
            userid: Some(*userid),
            timestamp: start + Duration::hours(i as i64),
            comment: Some(format!("edit {}", i)),
            tags: Some(Vec::new()),
            size,
            minor: false,
        });
        if parentid != 0 {
            wiki = wiki.with_diff(
                revid,
                CompareResponse {
                    fromsize: Some(size - 10),
                    tosize: size,
                    body: format!(
                        r#"<tr><td class="diff-addedline"><div>Paragraph {} about {}</div></td></tr>"#,
                        i, title
                    ),
                },
            );
        }
    }
    wiki.with_page(title, revisions)
}

/// Nine calm pages edited by accounts, one page edited only from IPs.
fn batch_wiki() -> MemoryWiki {
    let mut wiki = add_page(
        MemoryWiki::new(),
        "Hot",
        1000,
        10,
        &[
            ("192.0.2.1", 0),
            ("192.0.2.2", 0),
            ("192.0.2.1", 0),
            ("192.0.2.3", 0),
        ],
    );
    for n in 0..9u64 {
        wiki = add_page(
            wiki,
            &format!("Calm {}", n),
            2000 + n * 10,
            10,
            &[("Alice", 1), ("Bob", 2), ("Alice", 1), ("Bob", 2)],
        );
    }
    wiki.with_user(UserInfo {
        name: "Alice".into(),
        user_id: 1,
        edit_count: 5000,
        registration: Some(Utc.with_ymd_and_hms(2008, 3, 1, 0, 0, 0).unwrap()),
        groups: vec!["user".into()],
    })
}

fn titles() -> Vec<String> {
    let mut titles = vec!["Hot".to_string()];
    titles.extend((0..9).map(|n| format!("Calm {}", n)));
    titles
}

fn anon_analyzer(wiki: MemoryWiki) -> Analyzer {
    let mut metrics = MetricRegistry::new();
    metrics.register(AnonMetric).unwrap();
    let fetcher = EditFetcher::new(Arc::new(wiki), 4).unwrap();
    Analyzer::new(fetcher, metrics)
}

#[test]
fn test_ip_only_page_is_flagged() {
    let report = anon_analyzer(batch_wiki()).run(&titles(), None).unwrap();

    assert_eq!(report.sets.len(), 10);
    assert_eq!(report.total_edits(), 40);

    // fractions: 1.0 once, 0.0 nine times -> mean 0.1, sd sqrt(0.1)
    let hot = SetKey::page("Hot");
    let z_hot = report.table.rows[&hot]["anon"];
    assert!((z_hot - 0.9 / 0.1f64.sqrt()).abs() < 1e-9);
    let z_calm = report.table.rows[&SetKey::page("Calm 0")]["anon"];
    assert!((z_calm + 0.1 / 0.1f64.sqrt()).abs() < 1e-9);

    assert_eq!(report.outlier_count(), 1);
    assert!(report.outliers["anon"].contains_key(&hot));

    let users: Vec<&str> = report.all_users.iter().map(String::as_str).collect();
    assert_eq!(users, vec!["192.0.2.1", "192.0.2.2", "192.0.2.3"]);
    assert_eq!(
        report
            .flagged_accounts
            .sets_for("192.0.2.1")
            .map(|s| s.iter().cloned().collect::<Vec<_>>()),
        Some(vec!["Hot".to_string()])
    );
}

#[test]
fn test_uniform_batch_has_no_outliers() {
    let mut wiki = MemoryWiki::new();
    for n in 0..4u64 {
        wiki = add_page(wiki, &format!("Calm {}", n), 10 + n * 10, 10, &[("Alice", 1), ("Bob", 2)]);
    }
    let titles: Vec<String> = (0..4).map(|n| format!("Calm {}", n)).collect();
    let report = anon_analyzer(wiki).run(&titles, None).unwrap();

    assert!(report
        .table
        .rows
        .values()
        .all(|scores| scores["anon"] == 0.0));
    assert_eq!(report.outlier_count(), 0);
    assert!(report.flagged_accounts.is_empty());
}

#[test]
fn test_month_sets_split_page_history() {
    let mut records = Vec::new();
    for (revid, month) in [(1u64, 9u32), (2, 10), (3, 10)] {
        records.push(RevisionRecord {
            revid,
            parentid: 0,
            user: Some("Alice".into()),
            userid: Some(1),
            timestamp: Utc.with_ymd_and_hms(2021, month, 15, 0, 0, 0).unwrap(),
            comment: None,
            tags: None,
            size: 50,
            minor: false,
        });
    }
    let wiki = MemoryWiki::new().with_page("Split", records);

    let months = vec![
        YearMonth::new(2021, 9).unwrap(),
        YearMonth::new(2021, 10).unwrap(),
        YearMonth::new(2021, 11).unwrap(),
    ];
    let analyzer = anon_analyzer(wiki);
    let sets = analyzer
        .collect_edit_sets(&["Split".to_string()], Some(&months))
        .unwrap();

    let counts: Vec<(String, usize)> = sets.iter().map(|(k, v)| (k.to_string(), v.len())).collect();
    assert_eq!(
        counts,
        vec![
            ("Split 2021-09".to_string(), 1),
            ("Split 2021-10".to_string(), 2),
            ("Split 2021-11".to_string(), 0),
        ]
    );
}

#[test]
fn test_custom_metric_and_selection() {
    let wiki = batch_wiki();
    let api: Arc<dyn revsleuth::wiki::WikiApi> = Arc::new(wiki);
    let cache = Arc::new(AccountCache::from_api(api.clone()));
    let config = revsleuth::config::MetricsConfig::default();
    let mut metrics = MetricRegistry::builtin(&config, cache, Utc::now());
    metrics
        .register_fn("bob", "edit made by Bob", |edit| edit.user == "Bob")
        .unwrap();
    let metrics = metrics.select(&["bob", "anon"]).unwrap();
    assert_eq!(metrics.names(), vec!["bob", "anon"]);

    let fetcher = EditFetcher::new(api, 2).unwrap();
    let report = Analyzer::new(fetcher, metrics).run(&titles(), None).unwrap();
    // Bob edits every calm page and never the hot one
    assert!(report.table.rows[&SetKey::page("Hot")]["bob"] < 0.0);
    assert!(report.outliers["bob"].contains_key(&SetKey::page("Hot")));
    // No Bob edits in the hot page, so nobody is implicated by "bob"
    assert!(report.suspicious_users["bob"].is_empty());
}

#[test]
fn test_flagged_accounts_feed_profiles() {
    let wiki = batch_wiki();
    let analyzer = anon_analyzer(wiki);
    let report = analyzer.run(&titles(), None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flagged.json");
    report.flagged_accounts.merge_into_file(&path).unwrap();
    let loaded = FlaggedAccounts::load(&path).unwrap();
    assert_eq!(loaded, report.flagged_accounts);

    let profiles = ProfileBuilder::new(analyzer.fetcher())
        .with_contributions(10)
        .build_flagged(&loaded);
    assert_eq!(profiles.len(), 3);
    let first = &profiles[0];
    assert_eq!(first.username, "192.0.2.1");
    assert!(!first.registered);
    assert_eq!(first.contributions, 2);
    assert_eq!(first.flagged_sets, vec!["Hot".to_string()]);
}
