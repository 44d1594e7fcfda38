//! Login, logout and identity.

use idsdash_core::Dashboard;
use idsdash_core::api::AuthMode;
use serde::Serialize;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::{self, Context};
use crate::error::CliError;
use crate::output::{self, Palette};

#[derive(Serialize)]
struct SessionSummary {
    user: Option<String>,
    auth: &'static str,
    expires_at: Option<String>,
}

fn auth_label(mode: AuthMode) -> &'static str {
    match mode {
        AuthMode::Bearer => "bearer",
        AuthMode::Cookie => "cookie",
    }
}

fn detail(s: &SessionSummary) -> String {
    output::detail_lines(&[
        ("User", s.user.clone()),
        ("Auth", Some(s.auth.to_owned())),
        ("Expires", s.expires_at.clone()),
    ])
}

pub async fn login(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let username = config::resolve_username(args.username, &ctx.config)?;
    let password = config::resolve_login_password(args.password, &username)?;

    let resp = ctx.dashboard.login(&username, &password).await?;
    let api = ctx.dashboard.api();
    let summary = SessionSummary {
        user: resp.user.or(Some(username)),
        auth: auth_label(api.auth_mode()),
        expires_at: api.tokens().expires_at().map(|t| t.to_rfc3339()),
    };

    let palette = Palette::new(global.color);
    output::status(&palette.ok("Logged in"), global.quiet);
    let out = output::render_single(global.output, &summary, detail, |s| {
        s.user.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn logout(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    dashboard.logout().await;
    output::status("Logged out", global.quiet);
    Ok(())
}

pub async fn whoami(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let identity = dashboard.api().me().await?;
    let summary = SessionSummary {
        user: identity.user,
        auth: auth_label(dashboard.api().auth_mode()),
        expires_at: identity.expires_at,
    };
    let out = output::render_single(global.output, &summary, detail, |s| {
        s.user.clone().unwrap_or_default()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
