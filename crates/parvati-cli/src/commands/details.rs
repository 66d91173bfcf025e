//! `details`: show what Parvati stores about a user

use clap::Args;
use parvati_api::{Backend, User};
use std::io::Write;

/// Show Parvati's user information
#[derive(Debug, Args)]
pub struct DetailsArgs {
    /// Get details for this user rather than yourself
    #[arg(short, long)]
    pub user: Option<String>,

    /// Show linked identities. Only honoured for yourself or as an admin
    #[arg(short = 'i', long)]
    pub show_identities: bool,
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

fn true_or<'a>(value: bool, default: &'a str) -> &'a str {
    if value { "true" } else { default }
}

/// Print a user record. Without admin rights unset fields show as redacted.
pub fn render_user(user: &User, show_ids: bool, admin: bool, out: &mut dyn Write) -> std::io::Result<()> {
    let (def, bool_def) = if admin {
        ("[not set]", "false")
    } else {
        ("[redacted]", "[redacted]")
    };
    writeln!(out, "      Account id: {} / {} [{}]", user.id, user.nick, user.priv_level)?;
    writeln!(out, "         Created: {}", or_default(&user.created, def))?;
    writeln!(out, "    Password set: {}", true_or(user.has_password, bool_def))?;
    writeln!(out, "     Stored IPv4: {}", or_default(&user.ipv4, def))?;
    writeln!(out, "     Stored IPv6: {}", or_default(&user.ipv6, def))?;
    writeln!(out, "       Static IP: {}", true_or(user.static_ip, bool_def))?;
    writeln!(out, "    Default port: {}", user.port)?;
    writeln!(out, "    Private Join: {}", true_or(user.private, bool_def))?;
    writeln!(out, "   Stated Gender: {}", or_default(&user.gender, def))?;
    writeln!(out, "      Avatar Url: {}", or_default(&user.picture, def))?;
    writeln!(out, "Registered Email: {}", or_default(&user.email, def))?;

    if show_ids && !user.identities.is_empty() {
        writeln!(out, "Identities:")?;
        for (i, id) in user.identities.iter().enumerate() {
            writeln!(
                out,
                " - {:>3}. [{}] {} - {} [Created: {}]",
                i + 1,
                id.realm,
                id.nick,
                id.credential,
                id.created
            )?;
        }
    }
    Ok(())
}

pub async fn run(args: DetailsArgs, backend: &dyn Backend, out: &mut dyn Write) -> anyhow::Result<()> {
    let me = backend.details().await?;
    let Some(wanted) = args.user else {
        render_user(&me, args.show_identities, true, out)?;
        return Ok(());
    };

    let other = backend.user_details(&wanted).await?;
    if other.id == me.id {
        render_user(&me, args.show_identities, true, out)?;
        return Ok(());
    }
    let admin = me.priv_level == "super";
    render_user(&other, admin && args.show_identities, admin, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use parvati_api::Identity;

    fn me(priv_level: &str) -> User {
        User {
            id: 42,
            nick: "marisa".to_string(),
            priv_level: priv_level.to_string(),
            identities: vec![Identity {
                realm: "discord".to_string(),
                nick: "marisa#0001".to_string(),
                ..Identity::default()
            }],
            ..User::default()
        }
    }

    fn other() -> User {
        User {
            id: 7,
            nick: "reimu".to_string(),
            identities: vec![Identity::default()],
            ..User::default()
        }
    }

    async fn render(me: User, args: DetailsArgs) -> String {
        let mut backend = FakeBackend::with_user(me);
        backend.others.insert("reimu".to_string(), other());
        let mut out = Vec::new();
        run(args, &backend, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_own_details_show_unset_fields() {
        let text = render(
            me("user"),
            DetailsArgs {
                user: None,
                show_identities: true,
            },
        )
        .await;
        assert!(text.starts_with("      Account id: 42 / marisa [user]\n"));
        assert!(text.contains("     Stored IPv4: [not set]\n"));
        assert!(text.contains("    Password set: false\n"));
        assert!(text.contains("[discord] marisa#0001"));
    }

    #[tokio::test]
    async fn test_other_user_is_redacted_for_non_admins() {
        let text = render(
            me("user"),
            DetailsArgs {
                user: Some("reimu".to_string()),
                show_identities: true,
            },
        )
        .await;
        assert!(text.contains("7 / reimu"));
        assert!(text.contains("     Stored IPv4: [redacted]\n"));
        assert!(!text.contains("Identities:"));
    }

    #[tokio::test]
    async fn test_admin_sees_identities() {
        let text = render(
            me("super"),
            DetailsArgs {
                user: Some("reimu".to_string()),
                show_identities: true,
            },
        )
        .await;
        assert!(text.contains("     Stored IPv4: [not set]\n"));
        assert!(text.contains("Identities:"));
    }
}
