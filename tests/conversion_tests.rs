//! End-to-end tests: share links in, Clash documents out, and back.

use std::collections::HashSet;

use subrelay::extractor::extract_links;
use subrelay::models::{ProxyDetail, ProxyType};
use subrelay::utils::base64::{encode_standard, encode_url_safe};
use subrelay::{BatchOptions, ConvertOptions, Subrelay, TargetFormat};

fn ssr_link(name: &str, server: &str, port: u16) -> String {
    let body = format!(
        "{}:{}:origin:aes-256-cfb:plain:{}/?remarks={}&group={}",
        server,
        port,
        encode_url_safe("password1"),
        encode_url_safe(name),
        encode_url_safe("airport")
    );
    format!("ssr://{}", encode_url_safe(&body))
}

#[test]
fn base64_subscription_of_two_ssr_links_yields_two_nodes() {
    let relay = Subrelay::new();
    let blob = encode_standard(&format!(
        "{}\n{}\n",
        ssr_link("HK node", "hk.example.com", 443),
        ssr_link("JP node", "jp.example.com", 8443)
    ));

    let batch = relay
        .parse_base64_subscription(&blob, &BatchOptions::default())
        .unwrap();

    assert_eq!(batch.total, 2);
    assert_eq!(batch.success, 2);
    assert!(batch.failures.is_empty());
    assert_eq!(batch.nodes[0].name, "HK node");
    assert_eq!(batch.nodes[0].proxy_type(), ProxyType::ShadowsocksR);
    match &batch.nodes[1].detail {
        ProxyDetail::ShadowsocksR(ssr) => {
            assert_eq!(ssr.group.as_deref(), Some("airport"));
            assert_eq!(ssr.cipher, "aes-256-cfb");
        }
        other => panic!("unexpected detail: {:?}", other),
    }
}

#[test]
fn base64_subscription_converts_to_clash_with_base_template() {
    let relay = Subrelay::new();
    let blob = encode_standard(&format!(
        "{}\n{}\n",
        ssr_link("JP node", "jp.example.com", 8443),
        ssr_link("HK node", "hk.example.com", 443)
    ));
    let options = ConvertOptions {
        base: Some("port: 7890\nmode: rule\nrules:\n  - MATCH,DIRECT\n".to_string()),
        ..ConvertOptions::default()
    };

    let outcome = relay.convert_base64_subscription(
        &blob,
        TargetFormat::Clash,
        &BatchOptions::default(),
        &options,
    );

    assert!(outcome.is_success(), "warnings: {:?}", outcome.warnings);
    let document = outcome.document.unwrap();
    // Base template keys survive next to the generated proxy roster.
    assert!(document.contains("port: 7890"));
    assert!(document.contains("MATCH,DIRECT"));
    // Roster is sorted by name: HK before JP.
    let hk = document.find("HK node").unwrap();
    let jp = document.find("JP node").unwrap();
    assert!(hk < jp);
    assert_eq!(outcome.stats.valid, 2);
    assert_eq!(outcome.stats.by_protocol.get("SSR"), Some(&2));
}

#[test]
fn mixed_links_with_protocol_allow_list() {
    let relay = Subrelay::new();
    let text = format!(
        "{}\ntrojan://pw@tr.example.com:443?sni=tr.example.com#TR%20node\n",
        ssr_link("HK node", "hk.example.com", 443)
    );
    let options = ConvertOptions {
        allow_protocols: Some(HashSet::from([ProxyType::Trojan])),
        ..ConvertOptions::default()
    };

    let outcome = relay.convert_links(
        &text,
        TargetFormat::Clash,
        &BatchOptions::default(),
        &options,
    );

    assert!(outcome.is_success());
    let document = outcome.document.unwrap();
    assert!(document.contains("TR node"));
    assert!(!document.contains("HK node"));
    assert_eq!(outcome.stats.valid, 1);
}

#[test]
fn clash_document_round_trips_through_extraction() {
    let relay = Subrelay::new();
    let text = "\
ss://YWVzLTI1Ni1nY206c2VjcmV0@ss.example.com:8388#node1
trojan://pw@tr.example.com:443?sni=tr.example.com#node2
";
    let outcome = relay.convert_links(
        text,
        TargetFormat::Clash,
        &BatchOptions::default(),
        &ConvertOptions::default(),
    );
    let document = outcome.document.unwrap();

    let extraction = extract_links(relay.codecs(), &document).unwrap();

    assert_eq!(extraction.supported, 2);
    assert_eq!(extraction.unsupported, 0);
    let reparsed = relay.parse_links(&extraction.to_blob(), &BatchOptions::default());
    assert_eq!(reparsed.success, 2);
    let mut names: Vec<&str> = reparsed.nodes.iter().map(|n| n.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["node1", "node2"]);
}

#[test]
fn keyword_filters_apply_before_dedup_and_sort() {
    let relay = Subrelay::new();
    let text = format!(
        "{}\n{}\n{}\n",
        ssr_link("HK premium", "hk.example.com", 443),
        ssr_link("HK trial", "hk2.example.com", 443),
        ssr_link("JP premium", "jp.example.com", 443)
    );
    let options = ConvertOptions {
        include_keywords: vec!["premium".to_string()],
        exclude_keywords: vec!["JP".to_string()],
        ..ConvertOptions::default()
    };

    let outcome = relay.convert_links(
        &text,
        TargetFormat::Clash,
        &BatchOptions::default(),
        &options,
    );

    assert!(outcome.is_success());
    let document = outcome.document.unwrap();
    assert!(document.contains("HK premium"));
    assert!(!document.contains("HK trial"));
    assert!(!document.contains("JP premium"));
}
