use crate::model::Channel;
use shared::utils::short_hash;
use std::collections::HashSet;
use std::fmt::Write;

const EXTM3U: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF";

#[derive(Debug, Default)]
struct ExtInf {
    tvg_id: String,
    name: String,
    logo: String,
    group: String,
    title: String,
}

fn token_value(stack: &mut String, it: &mut std::str::Chars) -> String {
    if it.any(|ch| ch == '"') {
        for ch in it.by_ref() {
            if ch == '"' {
                break;
            }
            stack.push(ch);
        }
    }
    let result = stack.trim().to_string();
    stack.clear();
    result
}

fn token_till(stack: &mut String, it: &mut std::str::Chars, stop_char: char) -> Option<String> {
    for ch in it.by_ref() {
        if ch == stop_char {
            break;
        }
        if stack.is_empty() && ch.is_whitespace() {
            continue;
        }
        stack.push(ch);
    }
    if stack.is_empty() {
        None
    } else {
        let result = stack.trim().to_string();
        stack.clear();
        Some(result)
    }
}

#[inline]
fn skip_duration(it: &mut std::str::Chars) -> Option<char> {
    it.find(|c| !(*c == '-' || *c == '+' || *c == '.' || c.is_ascii_digit()))
}

fn parse_extinf(line: &str) -> Option<ExtInf> {
    let rest = line.strip_prefix(EXTINF)?.strip_prefix(':')?;
    let mut header = ExtInf::default();
    let mut it = rest.chars();
    let mut stack = String::with_capacity(64);
    let mut c = skip_duration(&mut it);
    while let Some(chr) = c {
        if chr == ',' {
            header.title = it.as_str().trim().to_string();
            break;
        }
        if !chr.is_whitespace() {
            stack.push(chr);
            if let Some(token) = token_till(&mut stack, &mut it, '=') {
                let value = token_value(&mut stack, &mut it);
                match token.to_lowercase().as_str() {
                    "tvg-id" => header.tvg_id = value,
                    "tvg-name" => header.name = value,
                    "tvg-logo" => header.logo = value,
                    "group-title" => header.group = value,
                    _ => {}
                }
            }
        }
        c = it.next();
    }
    Some(header)
}

/// Parses an M3U playlist into channels. Entries without an url are skipped,
/// duplicate ids fall back to a hash of the url.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut ids = HashSet::new();
    let mut header: Option<ExtInf> = None;

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(EXTINF) {
            header = parse_extinf(line);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        let url = line.to_string();
        let info = header.take().unwrap_or_default();
        let mut id = if info.tvg_id.is_empty() { short_hash(&url) } else { info.tvg_id.clone() };
        if !ids.insert(id.clone()) {
            id = short_hash(&url);
            if !ids.insert(id.clone()) {
                continue;
            }
        }
        let name = [&info.title, &info.name, &info.tvg_id]
            .into_iter()
            .find(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| id.clone());
        channels.push(Channel {
            id,
            name,
            url,
            category: info.group,
            logo: info.logo,
            tvg_id: info.tvg_id,
        });
    }
    channels
}

fn escape_attr(value: &str) -> String {
    value.replace('"', "'")
}

pub fn redirect_url(base_url: &str, username: &str, token: &str) -> String {
    let username: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("{base_url}/redirect/{username}/{token}")
}

/// Renders the playlist for one user, each channel paired with its redirect token.
pub fn render_playlist(base_url: &str, username: &str, entries: &[(&Channel, String)]) -> String {
    let mut body = String::with_capacity(64 + entries.len() * 256);
    body.push_str(EXTM3U);
    body.push('\n');
    for (channel, token) in entries {
        let _ = writeln!(body, r#"{EXTINF}:-1 tvg-id="{}" tvg-name="{}" tvg-logo="{}" group-title="{}",{}"#,
                         escape_attr(&channel.tvg_id), escape_attr(&channel.name), escape_attr(&channel.logo),
                         escape_attr(&channel.category), channel.name);
        body.push_str(&redirect_url(base_url, username, token));
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::{parse_m3u, redirect_url, render_playlist};

    const PLAYLIST: &str = r#"#EXTM3U
#EXTINF:-1 tvg-id="news.de" tvg-name="News HD" tvg-logo="http://logo/news.png" group-title="News",News HD
http://origin.example/live/news.m3u8

#EXTINF:-1 group-title="Sports" ,Sport 1
#EXTVLCOPT:http-user-agent=VLC
http://origin.example/live/sport1.ts
#EXTINF:0,
http://origin.example/live/untitled.ts
"#;

    #[test]
    fn test_parse_m3u() {
        let channels = parse_m3u(PLAYLIST);
        assert_eq!(channels.len(), 3);

        let news = &channels[0];
        assert_eq!(news.id, "news.de");
        assert_eq!(news.name, "News HD");
        assert_eq!(news.logo, "http://logo/news.png");
        assert_eq!(news.category, "News");
        assert_eq!(news.url, "http://origin.example/live/news.m3u8");

        let sport = &channels[1];
        assert_eq!(sport.name, "Sport 1");
        assert_eq!(sport.category, "Sports");
        assert_eq!(sport.url, "http://origin.example/live/sport1.ts");
        assert_eq!(sport.id.len(), 12);

        assert_eq!(channels[2].name, channels[2].id);
    }

    #[test]
    fn test_duplicate_ids() {
        let content = "#EXTINF:-1 tvg-id=\"a\",A\nhttp://x/1\n#EXTINF:-1 tvg-id=\"a\",A2\nhttp://x/2\n#EXTINF:-1 tvg-id=\"a\",A3\nhttp://x/2\n";
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].id, "a");
        assert_ne!(channels[1].id, "a");
    }

    #[test]
    fn test_render_playlist() {
        let channels = parse_m3u(PLAYLIST);
        let entries = vec![(&channels[0], "tok1".to_string()), (&channels[1], "tok2".to_string())];
        let body = render_playlist("http://gw:8901", "alice", &entries);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert!(lines[1].starts_with("#EXTINF:-1 tvg-id=\"news.de\""));
        assert!(lines[1].ends_with(",News HD"));
        assert_eq!(lines[2], "http://gw:8901/redirect/alice/tok1");
        assert_eq!(lines[4], "http://gw:8901/redirect/alice/tok2");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_redirect_url_encodes_username() {
        assert_eq!(redirect_url("http://gw", "bob@home", "t"), "http://gw/redirect/bob%40home/t");
    }
}
