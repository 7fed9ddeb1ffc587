//! Inquiry handlers.

use tabled::Tabled;

use carlot_core::{
    AppContext, GuardOptions, InquiriesHook, Inquiry, InquiryActions, InquiryHook,
    InquiryListParams, NewInquiry, Role,
};

use crate::cli::{GlobalOpts, InquiriesArgs, InquiriesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
pub(crate) struct InquiryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Car")]
    car: String,
    #[tabled(rename = "Buyer")]
    buyer: String,
    #[tabled(rename = "Dealer")]
    dealer: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&Inquiry> for InquiryRow {
    fn from(i: &Inquiry) -> Self {
        let mut message: String = i.message.chars().take(40).collect();
        if message.len() < i.message.len() {
            message.push('…');
        }
        Self {
            id: i.id.to_string(),
            car: util::opt(i.car_id.as_ref()),
            buyer: i.buyer_id.to_string(),
            dealer: i.dealer_id.to_string(),
            status: output::status_cell(&i.status.to_string()),
            message,
        }
    }
}

fn inquiry_detail(i: &Inquiry) -> String {
    output::detail_lines(&[
        ("ID", i.id.to_string()),
        ("Car", util::opt(i.car_id.as_ref())),
        ("Buyer", i.buyer_id.to_string()),
        ("Dealer", i.dealer_id.to_string()),
        ("Status", output::status_cell(&i.status.to_string())),
        ("Message", i.message.clone()),
    ])
}

fn print_inquiry(inquiry: &Inquiry, global: &GlobalOpts) {
    let out = output::render_single(&global.output, inquiry, inquiry_detail, |i| i.id.to_string());
    output::print_output(&out, global.quiet);
}

async fn mount_inquiry(ctx: &AppContext, raw_id: &str) -> Result<InquiryHook, CliError> {
    let hook = InquiryHook::new(ctx, util::entity_id(raw_id));
    util::check(&hook.fetch().await)?;
    Ok(hook)
}

pub async fn handle(
    ctx: &AppContext,
    args: InquiriesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InquiriesCommand::List {
            status,
            car,
            paging,
        } => {
            util::authorize(ctx, GuardOptions::authenticated()).await?;
            let params = InquiryListParams {
                status,
                car_id: car.as_deref().map(util::entity_id),
                page: paging.page,
                limit: paging.limit,
            };
            let hook = InquiriesHook::new(ctx);
            util::check(&hook.fetch(params).await)?;
            let items = hook.items();
            let out = output::render_list(
                &global.output,
                &items,
                |i| InquiryRow::from(i),
                |i| i.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InquiriesCommand::Send {
            dealer,
            car,
            message,
        } => {
            util::authorize(ctx, GuardOptions::role(Role::Buyer)).await?;
            let payload = NewInquiry {
                dealer_id: util::entity_id(&dealer),
                car_id: car.as_deref().map(util::entity_id),
                message,
            };
            let inquiry = InquiriesHook::new(ctx).create_inquiry(&payload).await?;
            print_inquiry(&inquiry, global);
            Ok(())
        }

        InquiriesCommand::Respond { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let hook = mount_inquiry(ctx, &id).await?;
            let inquiry = hook.mark_responded(hook.id()).await?;
            print_inquiry(&inquiry, global);
            Ok(())
        }

        InquiriesCommand::Close { id } => {
            util::authorize(ctx, GuardOptions::authenticated()).await?;
            let hook = mount_inquiry(ctx, &id).await?;
            let inquiry = hook.close_inquiry(hook.id()).await?;
            print_inquiry(&inquiry, global);
            Ok(())
        }
    }
}
