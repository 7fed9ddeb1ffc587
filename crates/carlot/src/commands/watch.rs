//! `carlot watch`: keep a list hook mounted and redraw on every change.
//!
//! Changes come from the interval refresh and from any invalidation the
//! hook receives; both land in the hook's cache and are rendered from there.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, warn};

use carlot_core::{
    AppContext, Car, CarListParams, CarRequest, ErrorKind, GuardOptions, Inquiry,
    InquiryListParams, ListHook, Page, RequestListParams, Resource,
};

use crate::cli::{GlobalOpts, WatchArgs, WatchTarget};
use crate::error::CliError;
use crate::output;

use super::cars::CarRow;
use super::inquiries::InquiryRow;
use super::requests::RequestRow;
use super::util;

pub async fn handle(ctx: &AppContext, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let every = Duration::from_secs(args.interval.max(1));
    match args.target {
        WatchTarget::Cars => {
            util::authorize(ctx, GuardOptions::public()).await?;
            let params = CarListParams {
                make: args.make,
                ..CarListParams::default()
            };
            follow::<Car, _>(ctx, params, every, global, |c| CarRow::from(c)).await
        }
        WatchTarget::Inquiries => {
            util::authorize(ctx, GuardOptions::authenticated()).await?;
            follow::<Inquiry, _>(ctx, InquiryListParams::default(), every, global, |i| {
                InquiryRow::from(i)
            })
            .await
        }
        WatchTarget::Requests => {
            util::authorize(ctx, GuardOptions::authenticated()).await?;
            let params = RequestListParams {
                make: args.make,
                ..RequestListParams::default()
            };
            follow::<CarRequest, _>(ctx, params, every, global, |r| RequestRow::from(r)).await
        }
    }
}

async fn follow<R, Row>(
    ctx: &AppContext,
    params: R::ListParams,
    every: Duration,
    global: &GlobalOpts,
    to_row: impl Fn(&R) -> Row,
) -> Result<(), CliError>
where
    R: Resource + Serialize,
    Row: Tabled,
{
    let hook = ListHook::<R>::new(ctx);
    util::check(&hook.fetch(params).await)?;
    if let Some(page) = hook.page() {
        draw(&page, global, &to_row);
    }

    let mut changes = hook.watch();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            _ = ticker.tick() => {
                let outcome = hook.refetch().await;
                debug!(?outcome, "interval refresh");
            }
            state = changes.changed() => {
                let Some(state) = state else { break Ok(()) };
                if state.loading {
                    continue;
                }
                if let Some(err) = state.error {
                    if err.kind() == ErrorKind::Auth {
                        break Err(CliError::from(err.as_ref()));
                    }
                    warn!(error = %err, "refresh failed; showing last good data");
                    continue;
                }
                if let Some(page) = state.data {
                    draw(&page, global, &to_row);
                }
            }
        }
    };

    hook.unmount();
    result
}

fn draw<R, Row>(page: &Page<R>, global: &GlobalOpts, to_row: &impl Fn(&R) -> Row)
where
    R: Resource + Serialize,
    Row: Tabled,
{
    let stamp = chrono::Local::now().format("%H:%M:%S");
    output::notice(
        &format!("── {stamp} · {} of {} ──", page.items.len(), page.pagination.total),
        global.quiet,
    );
    let out = output::render_list(&global.output, &page.items, to_row, |r| r.id().to_string());
    output::print_output(&out, global.quiet);
}
