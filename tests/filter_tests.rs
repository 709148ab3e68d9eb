use m3ufilter::playlist::{filter_playlist, FilterError, FilterPolicy};
use m3ufilter::rules::NamePolicy;

fn policy(categories: &[&str]) -> FilterPolicy {
    FilterPolicy {
        categories: categories.iter().map(|c| c.to_string()).collect(),
        ..FilterPolicy::default()
    }
}

fn run(content: &str, p: &FilterPolicy) -> String {
    filter_playlist(content, p).unwrap().playlist
}

#[test]
fn keeps_only_whitelisted_categories() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Россия | Russia",Channel 1
http://example.com/1
#EXTINF:-1 group-title="News",Channel 2
http://example.com/2
#EXTINF:-1 group-title="Развлекательные",Channel 3
http://example.com/3"#;

    let result = run(content, &policy(&["Россия | Russia", "Развлекательные"]));

    assert!(result.contains("Channel 1"));
    assert!(!result.contains("Channel 2"));
    assert!(result.contains("Channel 3"));
}

#[test]
fn category_match_is_exact_not_substring() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport News",Channel 1
http://example.com/1
#EXTINF:-1 group-title="Sport",Channel 2
http://example.com/2"#;

    let result = run(content, &policy(&["Sport"]));

    assert!(!result.contains("Channel 1"));
    assert!(result.contains("Channel 2"));
}

#[test]
fn entries_without_group_title_are_dropped() {
    let content = "#EXTM3U\n#EXTINF:-1,Bare Channel\nhttp://example.com/1";

    let result = run(content, &policy(&["Sport"]));
    assert!(!result.contains("Bare Channel"));
}

#[test]
fn strips_orig_suffix_from_kept_channels() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel A orig
http://example.com/a
#EXTINF:-1 group-title="News",Channel B
http://example.com/b"#;

    let outcome = filter_playlist(content, &policy(&["Sport"])).unwrap();

    assert!(outcome.playlist.contains("Channel A\n"));
    assert!(!outcome.playlist.contains("orig"));
    assert_eq!(outcome.stats.input_channels, 2);
    assert_eq!(outcome.stats.output_channels, 1);
}

#[test]
fn excludes_time_shift_and_numbered_channels() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Россия | Russia",Channel 1
http://example.com/1
#EXTINF:-1 group-title="Россия | Russia",Channel +1 (Приволжье)
http://example.com/plus1
#EXTINF:-1 group-title="Россия | Russia",Channel +5 HD
http://example.com/plus5hd
#EXTINF:-1 group-title="Россия | Russia",Channel +6
http://example.com/plus6
#EXTINF:-1 group-title="Россия | Russia",Channel +7 not regional
http://example.com/plus7
#EXTINF:-1 group-title="Россия | Russia",Channel HD 50
http://example.com/50
#EXTINF:-1 group-title="Россия | Russia",Channel 25
http://example.com/25
#EXTINF:-1 group-title="Россия | Russia",Normal Channel
http://example.com/normal"#;

    let result = run(content, &policy(&["Россия | Russia"]));

    assert!(result.contains("Channel 1"));
    assert!(!result.contains("Channel +1 (Приволжье)"));
    assert!(!result.contains("Channel +5 HD"));
    assert!(!result.contains("Channel +6"));
    assert!(result.contains("Channel +7 not regional"));
    assert!(!result.contains("Channel HD 50"));
    assert!(!result.contains("Channel 25"));
    assert!(result.contains("Normal Channel"));
}

#[test]
fn excludes_channels_by_name_substring() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Россия | Russia",Fashion TV
http://example.com/fashion1
#EXTINF:-1 group-title="Россия | Russia",Russian FASHION
http://example.com/fashion2
#EXTINF:-1 group-title="Россия | Russia",News Channel
http://example.com/news"#;

    let mut p = policy(&["Россия | Russia"]);
    p.names = NamePolicy::with_substrings(vec!["Fashion".to_string()]);
    let result = run(content, &p);

    assert!(!result.contains("Fashion TV"));
    assert!(!result.contains("Russian FASHION"));
    assert!(result.contains("News Channel"));
}

#[test]
fn prefers_hd_variant_over_non_hd() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel C
http://example.com/c
#EXTINF:-1 group-title="Sport",Channel C HD
http://example.com/chd
#EXTINF:-1 group-title="Sport",Channel D
http://example.com/d"#;

    let outcome = filter_playlist(content, &policy(&["Sport"])).unwrap();

    assert!(outcome.playlist.contains("Channel C HD"));
    assert!(!outcome.playlist.contains("http://example.com/c\n"));
    assert!(outcome.playlist.contains("Channel D"));
    assert_eq!(outcome.stats.output_channels, 2);
}

#[test]
fn keeps_lone_non_hd_variant_unchanged() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel C
http://example.com/c"#;

    let result = run(content, &policy(&["Sport"]));
    assert!(result.contains("Channel C"));
    assert!(result.contains("http://example.com/c"));
}

#[test]
fn collapses_duplicates_by_highest_tvg_rec() {
    let content = r#"#EXTM3U
#EXTINF:-1 tvg-rec="3" group-title="Sport",Channel 1
http://example.com/low
#EXTINF:-1 tvg-rec="7" group-title="Sport",Channel 1
http://example.com/high"#;

    let result = run(content, &policy(&["Sport"]));

    assert!(result.contains(r#"tvg-rec="7""#));
    assert!(!result.contains(r#"tvg-rec="3""#));
    assert!(result.contains("http://example.com/high"));
}

#[test]
fn duplicate_without_tvg_rec_keeps_first_occurrence() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel 2
http://example.com/first
#EXTINF:-1 group-title="Sport",Channel 2
http://example.com/second"#;

    let result = run(content, &policy(&["Sport"]));

    assert!(result.contains("http://example.com/first"));
    assert!(!result.contains("http://example.com/second"));
}

#[test]
fn preserves_first_occurrence_order() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Zeta
http://example.com/z
#EXTINF:-1 group-title="Sport",Alpha
http://example.com/a
#EXTINF:-1 group-title="Sport",Mid
http://example.com/m"#;

    let result = run(content, &policy(&["Sport"]));

    let zeta = result.find("Zeta").unwrap();
    let alpha = result.find("Alpha").unwrap();
    let mid = result.find("Mid").unwrap();
    assert!(zeta < alpha && alpha < mid);
}

#[test]
fn filtering_is_idempotent() {
    let content = r#"#EXTM3U url-tvg="http://old-epg.com/epg.xml"
#EXTINF:-1 group-title="Sport",Channel A orig
http://example.com/a
#EXTINF:-1 group-title="Sport",Channel C
http://example.com/c
#EXTINF:-1 tvg-rec="5" group-title="Sport",Channel C HD
http://example.com/chd
#EXTINF:-1 group-title="News",Channel B
http://example.com/b"#;

    let mut p = policy(&["Sport"]);
    p.epg_url = Some("https://bucket.example.com/epg.xml.gz".to_string());

    let first = filter_playlist(content, &p).unwrap();
    let second = filter_playlist(&first.playlist, &p).unwrap();

    assert_eq!(first.playlist, second.playlist);
    assert_eq!(
        second.stats.input_channels,
        second.stats.output_channels
    );
}

#[test]
fn output_never_gains_entries() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel A
http://example.com/a
#EXTINF:-1 group-title="Sport",Channel B
http://example.com/b"#;

    let outcome = filter_playlist(content, &policy(&["Sport"])).unwrap();
    assert!(outcome.stats.output_channels <= outcome.stats.input_channels);
}

#[test]
fn rewrites_url_tvg_in_header() {
    let content = r#"#EXTM3U url-tvg="http://old-epg.com/epg.xml"
#EXTINF:-1 group-title="Sport",Channel A
http://example.com/a"#;

    let mut p = policy(&["Sport"]);
    p.epg_url = Some("https://bucket.example.com/epg.xml.gz".to_string());
    let result = run(content, &p);

    assert!(result.starts_with("#EXTM3U"));
    assert!(result.contains("https://bucket.example.com/epg.xml.gz"));
    assert!(!result.contains("http://old-epg.com/epg.xml"));
    assert!(result.contains("Channel A"));
}

#[test]
fn adds_url_tvg_when_header_has_none() {
    let content = "#EXTM3U\n#EXTINF:-1 group-title=\"Sport\",Channel A\nhttp://example.com/a";

    let mut p = policy(&["Sport"]);
    p.epg_url = Some("https://bucket.example.com/epg.xml.gz".to_string());
    let result = run(content, &p);

    assert!(result
        .lines()
        .next()
        .unwrap()
        .contains(r#"url-tvg="https://bucket.example.com/epg.xml.gz""#));
}

#[test]
fn whitespace_only_input_yields_header_only() {
    let outcome = filter_playlist("  \n \n", &policy(&["Sport"])).unwrap();

    assert_eq!(outcome.playlist, "#EXTM3U");
    assert_eq!(outcome.stats.input_channels, 0);
    assert_eq!(outcome.stats.output_channels, 0);
    assert_eq!(outcome.stats.output_lines, 1);
}

#[test]
fn oversized_input_produces_no_output() {
    let content = "#EXTM3U\n#EXTINF:-1 group-title=\"Sport\",Channel A\nhttp://example.com/a";
    let p = FilterPolicy {
        max_input_bytes: 16,
        ..policy(&["Sport"])
    };

    match filter_playlist(content, &p) {
        Err(FilterError::Oversized { size, limit }) => {
            assert_eq!(size, content.len());
            assert_eq!(limit, 16);
        }
        other => panic!("expected oversized error, got {other:?}"),
    }
}

#[test]
fn sport_whitelist_end_to_end() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="Sport",Channel A orig
http://example.com/a
#EXTINF:-1 group-title="News",Channel B
http://example.com/b"#;

    let outcome = filter_playlist(content, &policy(&["Sport"])).unwrap();

    assert_eq!(
        outcome.playlist,
        "#EXTM3U\n#EXTINF:-1 group-title=\"Sport\",Channel A\nhttp://example.com/a"
    );
    assert_eq!(outcome.stats.input_lines, 5);
    assert_eq!(outcome.stats.input_channels, 2);
    assert_eq!(outcome.stats.output_lines, 3);
    assert_eq!(outcome.stats.output_channels, 1);
}
