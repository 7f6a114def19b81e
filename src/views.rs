//! HTML pages. Every piece of user-provided text goes through [`escape`].

use axum::http::StatusCode;

use crate::{
    registration::MIN_PASSWORD_LENGTH,
    report::{Settlement, SettlementReport},
    session::{Flash, FlashLevel},
    store::{PendingRegistration, Player, PlayerId, Settings, Transaction},
};

const REGISTRATION_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
const TRANSACTION_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

const STYLE: &str = "\
body { font-family: 'Segoe UI', Tahoma, sans-serif; background: #6a5acd; margin: 0; padding: 20px; }
.container { max-width: 1100px; margin: 0 auto; background: white; border-radius: 12px; padding: 30px; }
h1, h2 { color: #5a4fcf; }
.header { display: flex; justify-content: space-between; align-items: center; border-bottom: 2px solid #eee; }
.btn { padding: 8px 16px; background: #5a4fcf; color: white; border: none; border-radius: 5px; text-decoration: none; cursor: pointer; }
.btn-danger { background: #e74c3c; }
.btn-success { background: #27ae60; }
.menu, .stats, .grid { display: flex; gap: 12px; flex-wrap: wrap; margin: 20px 0; }
.card { background: #f7f7fb; padding: 15px; border-radius: 8px; min-width: 180px; }
.negative { color: #e74c3c; }
.positive { color: #27ae60; }
.flash { padding: 12px; margin-bottom: 20px; border-radius: 5px; background: #d4edda; color: #155724; }
.flash.error { background: #f8d7da; color: #721c24; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; }
label { display: block; font-weight: bold; margin-top: 12px; }
input, select { width: 100%; padding: 8px; }
";

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn money(amount: i64) -> String {
    if amount < 0 {
        format!("-€{}", -amount)
    } else {
        format!("€{}", amount)
    }
}

fn balance_class(balance: i64) -> &'static str {
    if balance < 0 { "negative" } else { "positive" }
}

fn layout(flash: Option<&Flash>, content: &str) -> String {
    let flash = match flash {
        Some(flash) => format!(
            "<div class=\"flash{}\">{}</div>",
            match flash.level {
                FlashLevel::Error => " error",
                FlashLevel::Success => "",
            },
            escape(&flash.message)
        ),
        None => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>Party Bank</title>\n<style>\n{}</style>\n</head>\n<body>\n\
         <div class=\"container\">\n{}{}\n</div>\n</body>\n</html>\n",
        STYLE, flash, content
    )
}

fn header(title: &str) -> String {
    format!(
        "<div class=\"header\"><h1>{}</h1><a class=\"btn btn-danger\" href=\"/logout\">Log out</a></div>",
        title
    )
}

fn back_home() -> &'static str {
    "<p><a href=\"/\">&larr; Back to home</a></p>"
}

fn player_options(players: &[Player]) -> String {
    let mut options = String::new();
    for player in players {
        options.push_str(&format!(
            "<option value=\"{}\">{} ({})</option>",
            player.id,
            escape(&player.name),
            money(player.balance)
        ));
    }
    options
}

fn player_cards(players: &[Player], highlight: Option<PlayerId>) -> String {
    if players.is_empty() {
        return "<p>No players yet</p>".to_string();
    }
    let mut cards = String::from("<div class=\"grid\">");
    for player in players {
        let you = if Some(player.id) == highlight {
            " <em>(you)</em>"
        } else {
            ""
        };
        cards.push_str(&format!(
            "<div class=\"card\"><strong>{}</strong>{}<div class=\"{}\">{}</div></div>",
            escape(&player.name),
            you,
            balance_class(player.balance),
            money(player.balance)
        ));
    }
    cards.push_str("</div>");
    cards
}

pub fn landing(flash: Option<&Flash>) -> String {
    layout(
        flash,
        "<h1>Party Bank</h1>\
         <p>Welcome! Choose how you want to sign in:</p>\
         <div class=\"menu\">\
         <a class=\"btn\" href=\"/admin/login\">Administrator login</a>\
         <a class=\"btn btn-success\" href=\"/player/register\">Register as a player</a>\
         <a class=\"btn\" href=\"/player/login\">Player login</a>\
         </div>",
    )
}

pub fn admin_login(flash: Option<&Flash>) -> String {
    let content = format!(
        "<h1>Administrator login</h1>\
         <form method=\"post\" action=\"/admin/login\">\
         <label>Password</label><input type=\"password\" name=\"password\" required autofocus>\
         <p><button class=\"btn\" type=\"submit\">Log in</button></p>\
         </form>{}",
        back_home()
    );
    layout(flash, &content)
}

pub fn player_register(flash: Option<&Flash>) -> String {
    let content = format!(
        "<h1>Player registration</h1>\
         <form method=\"post\" action=\"/player/register\">\
         <label>Full name</label><input type=\"text\" name=\"name\" required maxlength=\"64\" autofocus>\
         <label>Choose a password</label><input type=\"password\" name=\"password\" required minlength=\"{}\">\
         <p><button class=\"btn btn-success\" type=\"submit\">Send request</button></p>\
         </form>\
         <p>Your registration has to be approved by the administrator.</p>{}",
        MIN_PASSWORD_LENGTH,
        back_home()
    );
    layout(flash, &content)
}

pub fn player_login(flash: Option<&Flash>, players: &[Player]) -> String {
    let mut options = String::new();
    for player in players {
        options.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            player.id,
            escape(&player.name)
        ));
    }
    let content = format!(
        "<h1>Player login</h1>\
         <form method=\"post\" action=\"/player/login\">\
         <label>Select your name</label>\
         <select name=\"player_id\" required><option value=\"\">Select...</option>{}</select>\
         <label>Password</label><input type=\"password\" name=\"password\" required>\
         <p><button class=\"btn\" type=\"submit\">Log in</button></p>\
         </form>{}",
        options,
        back_home()
    );
    layout(flash, &content)
}

pub struct AdminDashboard<'a> {
    pub players: &'a [Player],
    pub pending: &'a [PendingRegistration],
    pub transactions: &'a [Transaction],
    pub total_balance: i64,
}

pub fn admin_dashboard(flash: Option<&Flash>, dashboard: &AdminDashboard) -> String {
    let mut content = header("Administrator dashboard");

    if !dashboard.pending.is_empty() {
        content.push_str(&format!(
            "<h2>Pending requests ({})</h2>",
            dashboard.pending.len()
        ));
        for registration in dashboard.pending {
            content.push_str(&format!(
                "<div class=\"card\"><strong>{}</strong> <small>requested {}</small>\
                 <form method=\"post\" action=\"/admin/approve/{}\" style=\"display:inline\">\
                 <button class=\"btn btn-success\" type=\"submit\">Approve</button></form> \
                 <form method=\"post\" action=\"/admin/reject/{}\" style=\"display:inline\">\
                 <button class=\"btn btn-danger\" type=\"submit\">Reject</button></form></div>",
                escape(&registration.name),
                registration.submitted_at.format(REGISTRATION_TIME_FORMAT),
                registration.id,
                registration.id
            ));
        }
    }

    content.push_str(&format!(
        "<div class=\"menu\">\
         <a class=\"btn\" href=\"/admin/transfer\">New transfer</a>\
         <a class=\"btn\" href=\"/admin/report\">Final report</a>\
         <a class=\"btn\" href=\"/admin/settings\">Settings</a>\
         </div>\
         <div class=\"stats\">\
         <div class=\"card\"><strong id=\"players\">{}</strong><div>Active players</div></div>\
         <div class=\"card\"><strong id=\"pending\">{}</strong><div>Pending</div></div>\
         <div class=\"card\"><strong id=\"transactions\">{}</strong><div>Transactions</div></div>\
         <div class=\"card\"><strong id=\"circulation\">{}</strong><div>Money in circulation</div></div>\
         </div>",
        dashboard.players.len(),
        dashboard.pending.len(),
        dashboard.transactions.len(),
        money(dashboard.total_balance)
    ));

    content.push_str("<h2>Players</h2>");
    content.push_str(&player_cards(dashboard.players, None));

    content.push_str("<h2>Transactions</h2>");
    if dashboard.transactions.is_empty() {
        content.push_str("<p>No transactions yet</p>");
    } else {
        content.push_str(
            "<table><thead><tr><th>Date/Time</th><th>From</th><th>To</th>\
             <th>Amount</th><th>Reason</th></tr></thead><tbody>",
        );
        for t in dashboard.transactions.iter().rev() {
            content.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                t.timestamp.format(TRANSACTION_TIME_FORMAT),
                escape(&t.from_name),
                escape(&t.to_name),
                money(t.amount),
                escape(&t.reason)
            ));
        }
        content.push_str("</tbody></table>");
    }

    layout(flash, &content)
}

pub fn player_dashboard(
    flash: Option<&Flash>,
    player: &Player,
    history: &[Transaction],
    players: &[Player],
) -> String {
    let mut content = header(&format!("Hi, {}!", escape(&player.name)));

    content.push_str(&format!(
        "<div class=\"card\"><div>Your current balance</div>\
         <h1 id=\"balance\" class=\"{}\">{}</h1></div>",
        balance_class(player.balance),
        money(player.balance)
    ));

    content.push_str("<h2>Your transactions</h2>");
    if history.is_empty() {
        content.push_str("<p>No transactions yet</p>");
    } else {
        content.push_str(
            "<table><thead><tr><th>Date/Time</th><th>Type</th><th>Amount</th>\
             <th>Reason</th></tr></thead><tbody>",
        );
        for t in history.iter().rev() {
            let (kind, sign, class) = if t.to_id == player.id {
                ("Received", "+", "positive")
            } else {
                ("Sent", "-", "negative")
            };
            content.push_str(&format!(
                "<tr><td>{}</td><td class=\"{}\">{}</td><td class=\"{}\">{}€{}</td><td>{}</td></tr>",
                t.timestamp.format(TRANSACTION_TIME_FORMAT),
                class,
                kind,
                class,
                sign,
                t.amount,
                escape(&t.reason)
            ));
        }
        content.push_str("</tbody></table>");
    }

    content.push_str("<h2>Players</h2>");
    content.push_str(&player_cards(players, Some(player.id)));

    layout(flash, &content)
}

pub fn transfer_form(flash: Option<&Flash>, players: &[Player]) -> String {
    let options = player_options(players);
    let content = format!(
        "{}<h2>New transfer</h2>\
         <form method=\"post\" action=\"/admin/transfer\">\
         <label>From</label><select name=\"from_player\" required><option value=\"\">Select...</option>{}</select>\
         <label>To</label><select name=\"to_player\" required><option value=\"\">Select...</option>{}</select>\
         <label>Amount (€)</label><input type=\"number\" name=\"amount\" min=\"1\" required>\
         <label>Reason</label><input type=\"text\" name=\"reason\" placeholder=\"e.g. won at cards\" required>\
         <p><button class=\"btn\" type=\"submit\">Transfer</button></p>\
         </form><p><a href=\"/admin/dashboard\">&larr; Back to dashboard</a></p>",
        header("Transfer"),
        options,
        options
    );
    layout(flash, &content)
}

pub fn report(flash: Option<&Flash>, report: &SettlementReport) -> String {
    let mut content = header("Final report");
    content.push_str(&format!(
        "<p>Settlement against an initial balance of <strong>{}</strong></p>",
        money(report.initial_balance)
    ));

    if report.lines.is_empty() {
        content.push_str("<p>No players yet</p>");
    } else {
        content.push_str(
            "<table><thead><tr><th>Player</th><th>Final balance</th><th>Difference</th>\
             <th>Settlement</th></tr></thead><tbody>",
        );
        for line in &report.lines {
            let settlement = match line.settlement {
                Settlement::Receives(amount) => {
                    format!("<span class=\"positive\">Receives {} in real money</span>", money(amount))
                }
                Settlement::Pays(amount) => {
                    format!("<span class=\"negative\">Pays {} in real money</span>", money(amount))
                }
                Settlement::Even => "Even".to_string(),
            };
            let sign = if line.delta >= 0 { "+" } else { "" };
            content.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}{}</td><td>{}</td></tr>",
                escape(&line.name),
                money(line.balance),
                balance_class(line.delta),
                sign,
                money(line.delta),
                settlement
            ));
        }
        content.push_str("</tbody></table>");
        content.push_str(&format!(
            "<p>Total to pay: <strong>{}</strong>. Total to receive: <strong>{}</strong>.</p>",
            money(report.total_to_pay),
            money(report.total_to_receive)
        ));
    }

    content.push_str("<p><a href=\"/admin/dashboard\">&larr; Back to dashboard</a></p>");
    layout(flash, &content)
}

pub fn settings(flash: Option<&Flash>, settings: &Settings) -> String {
    let content = format!(
        "{}<h2>Settings</h2>\
         <form method=\"post\" action=\"/admin/settings\">\
         <label>Initial balance for new players (€)</label>\
         <input type=\"number\" name=\"initial_balance\" value=\"{}\" required>\
         <p><button class=\"btn\" type=\"submit\">Save</button></p>\
         </form>\
         <h2>Danger zone</h2>\
         <form method=\"post\" action=\"/admin/reset\" \
         onsubmit=\"return confirm('Reset EVERYTHING? This cannot be undone.');\">\
         <button class=\"btn btn-danger\" type=\"submit\">Full reset (delete everything)</button>\
         </form><p><a href=\"/admin/dashboard\">&larr; Back to dashboard</a></p>",
        header("Settings"),
        settings.initial_balance
    );
    layout(flash, &content)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let content = format!(
        "<h1>{}</h1><p>{}</p>{}",
        status,
        escape(message),
        back_home()
    );
    layout(None, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_money() {
        assert_eq!(money(30), "€30");
        assert_eq!(money(-30), "-€30");
        assert_eq!(money(0), "€0");
    }

    #[test]
    fn test_transfer_form_requires_reason() {
        let page = transfer_form(None, &[]);
        assert!(page.contains("name=\"reason\" placeholder=\"e.g. won at cards\" required>"));
    }

    #[test]
    fn test_flash_is_rendered_escaped() {
        let flash = Flash {
            level: FlashLevel::Error,
            message: "<b>nope</b>".to_string(),
        };
        let page = landing(Some(&flash));
        assert!(page.contains("<div class=\"flash error\">&lt;b&gt;nope&lt;/b&gt;</div>"));
    }
}
