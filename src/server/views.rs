use super::HomeView;
use crate::Result;
use crate::crawler::{CrawlAck, CrawlRejection};
use crate::misc::{comma, round};
use crate::model::{RankWindow, RankedEntry, RecentCrawl, SectionLabel, UserBreakdown};
use core::fmt::Write;

const TITLE: &str = "GitHub Contributor Leaderboard";

/// Colors of the breakdown chart sections, reused in order
const SECTION_COLORS: [&str; 8] = [
    "#788EFF", "#2ED174", "#E68828", "#DF3739", "#DBD950", "#CD4CB8", "#6CC5CF", "#A2A2A2",
];

pub fn render_home<W: Write>(view: &HomeView, writer: &mut W) -> Result<()> {
    let mut page = HtmlPage::new(writer, TITLE);
    page.write_start()?;
    page.write_forms()?;
    page.write_counters(view)?;
    page.write_leaderboard(&view.top, None)?;
    page.write_recent(&view.recent)?;
    page.write_end()
}

pub fn render_find<W: Write>(login: &str, window: Option<&RankWindow>, writer: &mut W) -> Result<()> {
    let mut page = HtmlPage::new(writer, "Find your rank");
    page.write_start()?;
    page.write_forms()?;

    match window {
        Some(window) => {
            writeln!(
                page.writer,
                "<h2><a href=\"/user/{}\">{}</a> is ranked #{}</h2>",
                html_escape(login),
                html_escape(login),
                window.rank
            )?;
            page.write_leaderboard(&window.entries, Some(login))?;
        }
        None => {
            page.write_error(&format!("{login} is not on the leaderboard. Try asking for a crawl of one of their repositories."))?;
        }
    }

    page.write_end()
}

pub fn render_crawl<W: Write>(repo_id: &str, outcome: &Result<CrawlAck, CrawlRejection>, writer: &mut W) -> Result<()> {
    let mut page = HtmlPage::new(writer, "Crawl request");
    page.write_start()?;

    match outcome {
        Ok(CrawlAck::Queued) => writeln!(
            page.writer,
            "<p class=\"notice\">{} is next in line to be crawled. The leaderboard updates shortly after the crawl finishes.</p>",
            html_escape(repo_id.trim())
        )?,
        Ok(CrawlAck::AlreadyQueued) => writeln!(
            page.writer,
            "<p class=\"notice\">{} is already waiting to be crawled.</p>",
            html_escape(repo_id.trim())
        )?,
        Err(rejection) => page.write_error(&rejection.to_string())?,
    }

    page.write_forms()?;
    page.write_end()
}

#[expect(clippy::cast_precision_loss, reason = "displayed counts are far below 2^53")]
pub fn render_user<W: Write>(breakdown: &UserBreakdown, writer: &mut W) -> Result<()> {
    let user = &breakdown.user;
    let mut page = HtmlPage::new(writer, &user.login);
    page.write_start()?;

    writeln!(page.writer, "<div class=\"profile\">")?;
    if !user.avatar_url.is_empty() {
        writeln!(
            page.writer,
            "<img class=\"avatar\" src=\"{}\" alt=\"\" width=\"64\" height=\"64\">",
            html_escape(&user.avatar_url)
        )?;
    }
    writeln!(
        page.writer,
        "<h2><a href=\"{}\">{}</a></h2>",
        html_escape(&user.html_url),
        html_escape(&user.login)
    )?;
    writeln!(
        page.writer,
        "<p>Rank #{} with {} points from {} contributions.</p>",
        breakdown.rank,
        comma(user.score),
        comma(user.contributions as f64)
    )?;
    writeln!(page.writer, "</div>")?;

    page.write_breakdown(breakdown)?;
    page.write_end()
}

pub fn render_error<W: Write>(message: &str, writer: &mut W) -> Result<()> {
    let mut page = HtmlPage::new(writer, TITLE);
    page.write_start()?;
    page.write_error(message)?;
    page.write_end()
}

struct HtmlPage<'a, W: Write> {
    writer: &'a mut W,
    title: &'a str,
}

impl<'a, W: Write> HtmlPage<'a, W> {
    const fn new(writer: &'a mut W, title: &'a str) -> Self {
        Self { writer, title }
    }

    fn write_start(&mut self) -> Result<()> {
        writeln!(self.writer, "<!DOCTYPE html>")?;
        writeln!(self.writer, "<html lang=\"en\">")?;
        writeln!(self.writer, "<head>")?;
        writeln!(self.writer, "<meta charset=\"UTF-8\">")?;
        writeln!(
            self.writer,
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
        )?;
        writeln!(self.writer, "<title>{}</title>", html_escape(self.title))?;
        self.write_styles()?;
        writeln!(self.writer, "</head>")?;
        writeln!(self.writer, "<body>")?;
        writeln!(self.writer, "<div class=\"container\">")?;
        writeln!(self.writer, "<h1><a href=\"/\">{TITLE}</a></h1>")?;
        Ok(())
    }

    fn write_styles(&mut self) -> Result<()> {
        writeln!(self.writer, "<style>")?;
        writeln!(self.writer, ":root {{ color-scheme: light dark; }}")?;
        writeln!(
            self.writer,
            "body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; line-height: 1.5; padding: 20px; }}"
        )?;
        writeln!(self.writer, ".container {{ max-width: 960px; margin: 0 auto; }}")?;
        writeln!(self.writer, "h1 a {{ color: inherit; text-decoration: none; }}")?;
        writeln!(self.writer, "table {{ border-collapse: collapse; width: 100%; margin: 1rem 0; }}")?;
        writeln!(self.writer, "th, td {{ padding: 4px 8px; border-bottom: 1px solid #8884; text-align: left; }}")?;
        writeln!(self.writer, "td.num {{ text-align: right; font-variant-numeric: tabular-nums; }}")?;
        writeln!(self.writer, "tr.highlight {{ background: #ffd70044; }}")?;
        writeln!(self.writer, "img.avatar {{ vertical-align: middle; border-radius: 4px; }}")?;
        writeln!(self.writer, "form {{ display: inline-block; margin: 0 1rem 1rem 0; }}")?;
        writeln!(self.writer, ".error {{ color: #DF3739; font-weight: bold; }}")?;
        writeln!(self.writer, ".notice {{ color: #2ED174; font-weight: bold; }}")?;
        writeln!(self.writer, ".counters {{ opacity: 0.8; }}")?;
        writeln!(
            self.writer,
            ".chart {{ width: 240px; height: 240px; border-radius: 50%; margin: 1rem 0; }}"
        )?;
        writeln!(
            self.writer,
            ".swatch {{ display: inline-block; width: 12px; height: 12px; margin-right: 6px; }}"
        )?;
        writeln!(self.writer, "</style>")?;
        Ok(())
    }

    fn write_end(&mut self) -> Result<()> {
        writeln!(self.writer, "</div>")?;
        writeln!(self.writer, "</body>")?;
        writeln!(self.writer, "</html>")?;
        Ok(())
    }

    fn write_error(&mut self, message: &str) -> Result<()> {
        writeln!(self.writer, "<p class=\"error\">{}</p>", html_escape(message))?;
        Ok(())
    }

    fn write_forms(&mut self) -> Result<()> {
        writeln!(self.writer, "<form action=\"/find\" method=\"get\">")?;
        writeln!(
            self.writer,
            "<input type=\"text\" name=\"user\" placeholder=\"GitHub username\" required>"
        )?;
        writeln!(self.writer, "<button type=\"submit\">Find rank</button>")?;
        writeln!(self.writer, "</form>")?;

        writeln!(self.writer, "<form action=\"/crawl\" method=\"post\">")?;
        writeln!(
            self.writer,
            "<input type=\"text\" name=\"repoId\" placeholder=\"owner/name\" required>"
        )?;
        writeln!(self.writer, "<button type=\"submit\">Crawl repository</button>")?;
        writeln!(self.writer, "</form>")?;
        Ok(())
    }

    #[expect(clippy::cast_precision_loss, reason = "displayed counts are far below 2^53")]
    fn write_counters(&mut self, view: &HomeView) -> Result<()> {
        let counters = view.counters;
        writeln!(
            self.writer,
            "<p class=\"counters\">{} users with {} contributions to {} repositories.</p>",
            comma(counters.users as f64),
            comma(counters.contributions as f64),
            comma(counters.repositories as f64)
        )?;

        if let Some(until) = view.paused_until {
            writeln!(
                self.writer,
                "<p class=\"notice\">Crawling is paused until {} while the GitHub rate limit resets.</p>",
                until.format("%H:%M UTC")
            )?;
        }
        Ok(())
    }

    #[expect(clippy::cast_precision_loss, reason = "displayed counts are far below 2^53")]
    fn write_leaderboard(&mut self, entries: &[RankedEntry], highlight: Option<&str>) -> Result<()> {
        if entries.is_empty() {
            writeln!(self.writer, "<p>Nobody is ranked yet.</p>")?;
            return Ok(());
        }

        writeln!(self.writer, "<table>")?;
        writeln!(
            self.writer,
            "<thead><tr><th>Rank</th><th>User</th><th>Points</th><th>Contributions</th></tr></thead>"
        )?;
        writeln!(self.writer, "<tbody>")?;

        for entry in entries {
            let user = &entry.user;
            let class = if highlight == Some(user.login.as_str()) {
                " class=\"highlight\""
            } else {
                ""
            };

            writeln!(self.writer, "<tr{class}>")?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", entry.rank)?;
            write!(self.writer, "<td>")?;
            if !user.avatar_url.is_empty() {
                write!(
                    self.writer,
                    "<img class=\"avatar\" src=\"{}\" alt=\"\" width=\"24\" height=\"24\"> ",
                    html_escape(&user.avatar_url)
                )?;
            }
            writeln!(
                self.writer,
                "<a href=\"/user/{}\">{}</a></td>",
                html_escape(&user.login),
                html_escape(&user.login)
            )?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", comma(user.score))?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", comma(user.contributions as f64))?;
            writeln!(self.writer, "</tr>")?;
        }

        writeln!(self.writer, "</tbody>")?;
        writeln!(self.writer, "</table>")?;
        Ok(())
    }

    #[expect(clippy::cast_precision_loss, reason = "displayed counts are far below 2^53")]
    fn write_recent(&mut self, recent: &[RecentCrawl]) -> Result<()> {
        writeln!(self.writer, "<h2>Recently crawled</h2>")?;
        if recent.is_empty() {
            writeln!(self.writer, "<p>Nothing crawled yet.</p>")?;
            return Ok(());
        }

        writeln!(self.writer, "<table>")?;
        writeln!(
            self.writer,
            "<thead><tr><th>Repository</th><th>Watchers</th><th>Contributors</th><th>Crawled</th></tr></thead>"
        )?;
        writeln!(self.writer, "<tbody>")?;

        for crawl in recent {
            writeln!(self.writer, "<tr>")?;
            writeln!(
                self.writer,
                "<td><a href=\"{}\">{}</a>{}</td>",
                html_escape(&crawl.url),
                html_escape(crawl.id.as_str()),
                if crawl.stored { "" } else { " (not ranked)" }
            )?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", comma(crawl.weight as f64))?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", comma(crawl.contributor_count as f64))?;
            writeln!(self.writer, "<td>{}</td>", crawl.crawled_at.format("%Y-%m-%d %H:%M UTC"))?;
            writeln!(self.writer, "</tr>")?;
        }

        writeln!(self.writer, "</tbody>")?;
        writeln!(self.writer, "</table>")?;
        Ok(())
    }

    fn write_breakdown(&mut self, breakdown: &UserBreakdown) -> Result<()> {
        if breakdown.sections.is_empty() {
            return Ok(());
        }

        // the chart is a conic gradient with one stop pair per section
        let mut stops = Vec::with_capacity(breakdown.sections.len());
        let mut start = 0.0;
        for (i, section) in breakdown.sections.iter().enumerate() {
            let end = start + section.share * 100.0;
            stops.push(format!(
                "{} {}% {}%",
                SECTION_COLORS[i % SECTION_COLORS.len()],
                round(start, 2),
                round(end, 2)
            ));
            start = end;
        }

        writeln!(
            self.writer,
            "<div class=\"chart\" style=\"background: conic-gradient({});\"></div>",
            stops.join(", ")
        )?;

        writeln!(self.writer, "<table>")?;
        writeln!(
            self.writer,
            "<thead><tr><th>Repository</th><th>Share</th><th>Points</th></tr></thead>"
        )?;
        writeln!(self.writer, "<tbody>")?;

        for (i, section) in breakdown.sections.iter().enumerate() {
            let label = section.label.to_string();
            writeln!(self.writer, "<tr>")?;
            write!(
                self.writer,
                "<td><span class=\"swatch\" style=\"background: {}\"></span>",
                SECTION_COLORS[i % SECTION_COLORS.len()]
            )?;
            if matches!(section.label, SectionLabel::Repo(_)) {
                writeln!(
                    self.writer,
                    "<a href=\"https://github.com/{}\">{}</a></td>",
                    html_escape(&label),
                    html_escape(&label)
                )?;
            } else {
                writeln!(self.writer, "{}</td>", html_escape(&label))?;
            }
            writeln!(self.writer, "<td class=\"num\">{}%</td>", round(section.share * 100.0, 1))?;
            writeln!(self.writer, "<td class=\"num\">{}</td>", comma(section.points))?;
            writeln!(self.writer, "</tr>")?;
        }

        writeln!(self.writer, "</tbody>")?;
        writeln!(self.writer, "</table>")?;
        Ok(())
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RepoId, RepoPoints, SnapshotCounters, UserAggregate, breakdown};
    use chrono::{DateTime, Utc};

    fn user(login: &str, score: f64) -> UserAggregate {
        UserAggregate {
            login: login.to_string(),
            id: 1,
            avatar_url: String::new(),
            html_url: format!("https://github.com/{login}"),
            score,
            contributions: 1234,
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_home_lists_users_and_counters() {
        let view = HomeView {
            top: vec![RankedEntry {
                rank: 1,
                user: user("alice", 90.0),
            }],
            counters: SnapshotCounters {
                repositories: 2,
                users: 3,
                contributions: 15_000,
            },
            recent: Vec::new(),
            built_at: Utc::now(),
            paused_until: None,
        };

        let mut html = String::new();
        render_home(&view, &mut html).unwrap();

        assert!(html.contains("<a href=\"/user/alice\">alice</a>"));
        assert!(html.contains("3 users with 15,000 contributions to 2 repositories"));
        assert!(html.contains("Nothing crawled yet"));
        assert!(!html.contains("paused"));
    }

    #[test]
    fn test_home_shows_crawl_pause() {
        let until = DateTime::parse_from_rfc3339("2024-01-01T13:45:00Z").unwrap().to_utc();
        let view = HomeView {
            top: Vec::new(),
            counters: SnapshotCounters::default(),
            recent: Vec::new(),
            built_at: Utc::now(),
            paused_until: Some(until),
        };

        let mut html = String::new();
        render_home(&view, &mut html).unwrap();

        assert!(html.contains("Crawling is paused until 13:45 UTC"));
    }

    #[test]
    fn test_find_escapes_unknown_login() {
        let mut html = String::new();
        render_find("<script>", None, &mut html).unwrap();

        assert!(html.contains("&lt;script&gt; is not on the leaderboard"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_crawl_rejection_message() {
        let outcome = Err(CrawlRejection::Cooldown {
            minutes_ago: 10,
            minutes_remaining: 50,
        });

        let mut html = String::new();
        render_crawl("a/b", &outcome, &mut html).unwrap();

        assert!(html.contains("try again in ~50 minutes"));
    }

    #[test]
    fn test_user_breakdown_chart() {
        let points = vec![
            RepoPoints {
                repo: RepoId::parse("org/a").unwrap(),
                points: 75.0,
            },
            RepoPoints {
                repo: RepoId::parse("org/b").unwrap(),
                points: 25.0,
            },
        ];
        let breakdown = UserBreakdown {
            rank: 4,
            user: user("alice", 100.0),
            sections: breakdown::sections(100.0, &points),
        };

        let mut html = String::new();
        render_user(&breakdown, &mut html).unwrap();

        assert!(html.contains("conic-gradient(#788EFF 0% 75%, #2ED174 75% 100%)"));
        assert!(html.contains("Rank #4"));
        assert!(html.contains("<td class=\"num\">75%</td>"));
    }
}
