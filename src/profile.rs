//! Profile loading: sign-in flow, the concurrent query bundle and the level probe.

use crate::auth::token::{decode_identity, DecodedIdentity};
use crate::auth::{CredentialExchange, Login};
use crate::error::{DashboardError, Result};
use crate::graphql::queries::{
    fetch_progress, fetch_results, fetch_transactions, fetch_user, ProgressFilter, TransactionFilter,
};
use crate::graphql::DataSource;
use crate::logging::{log, obj, v_str, Domain, Level, ProfileScope};
use crate::model::{build_profile, LevelProbe, ProfileBundle, ProfileView};
use crate::session::SessionStore;

/// Exchange credentials and persist the resulting session.
pub async fn login(
    exchange: &dyn CredentialExchange,
    store: &mut dyn SessionStore,
    identifier: &str,
    password: &str,
) -> Result<Login> {
    let login = exchange.sign_in(identifier, password).await?;
    store.save_login(&login.token, &login.identity)?;
    Ok(login)
}

/// Best-effort: any failure means "no probe", which later yields Beginner.
async fn probe_levels(source: &dyn DataSource, user_id: Option<i64>) -> Option<LevelProbe> {
    let progress_filter = ProgressFilter::level_markers().for_user(user_id);
    let tx_filter = TransactionFilter::level_markers().for_user(user_id);
    let probed = tokio::try_join!(
        fetch_progress(source, &progress_filter),
        fetch_transactions(source, &tx_filter)
    );
    match probed {
        Ok((progress, transactions)) => Some(LevelProbe { progress, transactions }),
        Err(err) => {
            log(
                Level::Warn,
                Domain::Model,
                "level_probe_failed",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            None
        }
    }
}

/// Fetch every record set the dashboard needs. The main queries run
/// concurrently and fail fast; the level probe runs beside them and never fails.
pub async fn load_bundle(source: &dyn DataSource, user_id: Option<i64>) -> Result<ProfileBundle> {
    let _scope = ProfileScope::new("load_bundle");

    let xp_filter = TransactionFilter::kind("xp").for_user(user_id);
    let up_filter = TransactionFilter::kind("up").for_user(user_id);
    let down_filter = TransactionFilter::kind("down").for_user(user_id);
    let skill_filter = TransactionFilter::skills().for_user(user_id);
    let progress_filter = ProgressFilter::all().for_user(user_id);
    let result_filter = ProgressFilter::category("project").for_user(user_id);

    let core = async {
        tokio::try_join!(
            fetch_user(source),
            fetch_transactions(source, &xp_filter),
            fetch_transactions(source, &up_filter),
            fetch_transactions(source, &down_filter),
            fetch_transactions(source, &skill_filter),
            fetch_progress(source, &progress_filter),
            fetch_results(source, &result_filter)
        )
    };
    let (core, level_probe) = tokio::join!(core, probe_levels(source, user_id));
    let (user, xp, audits_given, audits_received, skills, progress, results) = core?;

    Ok(ProfileBundle {
        user,
        xp,
        audits_given,
        audits_received,
        skills,
        progress,
        results,
        level_probe,
    })
}

/// The stored identity, or one decoded afresh from the token when the stored
/// value is missing or unreadable.
fn session_identity(store: &dyn SessionStore, token: &str) -> DecodedIdentity {
    match store.identity() {
        Ok(Some(identity)) => identity,
        Ok(None) => decode_identity(token),
        Err(err) => {
            log(
                Level::Warn,
                Domain::Session,
                "identity_rederived",
                obj(&[("error", v_str(&err.to_string()))]),
            );
            decode_identity(token)
        }
    }
}

/// Load and build the view model for the session's user.
pub async fn load_profile(source: &dyn DataSource, store: &dyn SessionStore) -> Result<(ProfileBundle, ProfileView)> {
    let token = store.require_token()?;
    let user_id = session_identity(store, &token).user_id();
    let bundle = load_bundle(source, user_id).await?;
    let view = build_profile(&bundle);
    Ok((bundle, view))
}

/// After a failed load: drop a session the server no longer accepts.
/// Returns true when the user has to log in again.
pub fn settle_failure(store: &mut dyn SessionStore, err: &DashboardError) -> Result<bool> {
    if !err.is_auth_failure() {
        return Ok(false);
    }
    log(
        Level::Warn,
        Domain::Session,
        "session_rejected",
        obj(&[("error", v_str(&err.to_string()))]),
    );
    store.clear()?;
    Ok(true)
}
