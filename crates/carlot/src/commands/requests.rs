//! Car request handlers.

use tabled::Tabled;

use carlot_core::{
    AppContext, CarRequest, GuardOptions, NewCarRequest, RequestActions, RequestHook,
    RequestListParams, RequestsHook, Role,
};

use crate::cli::{GlobalOpts, RequestsArgs, RequestsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
pub(crate) struct RequestRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Looking for")]
    wanted: String,
    #[tabled(rename = "Years")]
    years: String,
    #[tabled(rename = "Max price")]
    price_max: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn wanted(r: &CarRequest) -> String {
    match (r.make.as_deref(), r.model.as_deref()) {
        (Some(make), Some(model)) => format!("{make} {model}"),
        (Some(only), None) | (None, Some(only)) => only.to_owned(),
        (None, None) => "any".to_owned(),
    }
}

impl From<&CarRequest> for RequestRow {
    fn from(r: &CarRequest) -> Self {
        let years = match (r.year_min, r.year_max) {
            (None, None) => String::new(),
            (min, max) => format!("{}-{}", util::opt(min), util::opt(max)),
        };
        Self {
            id: r.id.to_string(),
            wanted: wanted(r),
            years,
            price_max: r.price_max.map(|p| format!("{p:.0}")).unwrap_or_default(),
            status: output::status_cell(&r.status.to_string()),
        }
    }
}

fn request_detail(r: &CarRequest) -> String {
    output::detail_lines(&[
        ("ID", r.id.to_string()),
        ("Buyer", r.buyer_id.to_string()),
        ("Looking for", wanted(r)),
        ("Year from", util::opt(r.year_min)),
        ("Year to", util::opt(r.year_max)),
        ("Max price", util::opt(r.price_max)),
        ("Status", output::status_cell(&r.status.to_string())),
        ("Requirements", r.requirements.clone()),
    ])
}

fn print_request(request: &CarRequest, global: &GlobalOpts) {
    let out = output::render_single(&global.output, request, request_detail, |r| r.id.to_string());
    output::print_output(&out, global.quiet);
}

async fn mount_request(ctx: &AppContext, raw_id: &str) -> Result<RequestHook, CliError> {
    let hook = RequestHook::new(ctx, util::entity_id(raw_id));
    util::check(&hook.fetch().await)?;
    Ok(hook)
}

pub async fn handle(
    ctx: &AppContext,
    args: RequestsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RequestsCommand::List {
            status,
            make,
            paging,
        } => {
            util::authorize(ctx, GuardOptions::authenticated()).await?;
            let params = RequestListParams {
                status,
                make,
                page: paging.page,
                limit: paging.limit,
            };
            let hook = RequestsHook::new(ctx);
            util::check(&hook.fetch(params).await)?;
            let items = hook.items();
            let out = output::render_list(
                &global.output,
                &items,
                |r| RequestRow::from(r),
                |r| r.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RequestsCommand::Create {
            make,
            model,
            year_min,
            year_max,
            price_max,
            requirements,
        } => {
            util::authorize(ctx, GuardOptions::role(Role::Buyer)).await?;
            let payload = NewCarRequest {
                make,
                model,
                year_min,
                year_max,
                price_max,
                requirements,
            };
            let request = RequestsHook::new(ctx).create_request(&payload).await?;
            print_request(&request, global);
            Ok(())
        }

        RequestsCommand::Close { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Buyer)).await?;
            let hook = mount_request(ctx, &id).await?;
            let request = hook.close_request(hook.id()).await?;
            print_request(&request, global);
            Ok(())
        }

        RequestsCommand::Reopen { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Buyer)).await?;
            let hook = mount_request(ctx, &id).await?;
            let request = hook.reopen_request(hook.id()).await?;
            print_request(&request, global);
            Ok(())
        }
    }
}
