//! Car listing handlers.

use tabled::Tabled;

use carlot_core::{
    AppContext, Car, CarActions, CarHook, CarListParams, CarPatch, CarsHook, GuardOptions, NewCar,
    Role,
};

use crate::cli::{CarFilterArgs, CarsArgs, CarsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct CarRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Car")]
    title: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Mileage")]
    mileage: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Available")]
    available: &'static str,
}

impl From<&Car> for CarRow {
    fn from(c: &Car) -> Self {
        Self {
            id: c.id.to_string(),
            title: c.title(),
            price: format!("{:.0}", c.price),
            mileage: c.mileage,
            status: output::status_cell(&c.status.to_string()),
            available: if c.is_available { "yes" } else { "no" },
        }
    }
}

fn car_detail(c: &Car) -> String {
    output::detail_lines(&[
        ("ID", c.id.to_string()),
        ("Car", c.title()),
        ("Price", format!("{:.2}", c.price)),
        ("Mileage", c.mileage.to_string()),
        ("Status", output::status_cell(&c.status.to_string())),
        ("Available", c.is_available.to_string()),
        ("Dealer", c.dealer_id.to_string()),
        ("Main image", util::opt(c.main_image().map(|i| i.url.as_str()))),
        ("Description", util::opt(c.description.as_deref())),
    ])
}

pub(crate) fn list_params(filter: CarFilterArgs) -> CarListParams {
    CarListParams {
        make: filter.make,
        model: filter.model,
        year_min: filter.year_min,
        year_max: filter.year_max,
        price_max: filter.price_max,
        status: filter.status,
        dealer_id: filter.dealer.as_deref().map(util::entity_id),
        sort: filter.sort,
        page: filter.paging.page,
        limit: filter.paging.limit,
    }
}

fn print_car(car: &Car, global: &GlobalOpts) {
    let out = output::render_single(&global.output, car, car_detail, |c| c.id.to_string());
    output::print_output(&out, global.quiet);
}

/// Mount the record first so status moves are checked against what the
/// server last said.
async fn mount_car(ctx: &AppContext, raw_id: &str) -> Result<CarHook, CliError> {
    let hook = CarHook::new(ctx, util::entity_id(raw_id));
    util::check(&hook.fetch().await)?;
    Ok(hook)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &AppContext, args: CarsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        CarsCommand::List(filter) => {
            util::authorize(ctx, GuardOptions::public()).await?;
            let hook = CarsHook::new(ctx);
            util::check(&hook.fetch(list_params(filter)).await)?;
            let items = hook.items();
            let out = output::render_list(
                &global.output,
                &items,
                |c| CarRow::from(c),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            if let Some(page) = hook.page() {
                let p = &page.pagination;
                if matches!(global.output, crate::cli::OutputFormat::Table) {
                    output::notice(&format!("page {}/{} ({} total)", p.page, p.pages, p.total), global.quiet);
                }
            }
            Ok(())
        }

        CarsCommand::Get { id } => {
            util::authorize(ctx, GuardOptions::public()).await?;
            let hook = mount_car(ctx, &id).await?;
            let car = hook.record().ok_or(CliError::NotFound { identifier: id })?;
            print_car(&car, global);
            Ok(())
        }

        CarsCommand::Create {
            make,
            model,
            year,
            price,
            mileage,
            description,
        } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let payload = NewCar {
                make,
                model,
                year,
                price,
                mileage,
                images: Vec::new(),
                description,
            };
            let car = CarsHook::new(ctx).create_car(&payload).await?;
            print_car(&car, global);
            Ok(())
        }

        CarsCommand::Update {
            id,
            price,
            mileage,
            description,
        } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let patch = CarPatch {
                price,
                mileage,
                description,
                ..CarPatch::default()
            };
            let hook = CarHook::new(ctx, util::entity_id(&id));
            let car = hook.update_car(hook.id(), &patch).await?;
            print_car(&car, global);
            Ok(())
        }

        CarsCommand::Sold { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let hook = mount_car(ctx, &id).await?;
            let car = hook.mark_sold(hook.id()).await?;
            print_car(&car, global);
            Ok(())
        }

        CarsCommand::Availability { id, available } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let hook = mount_car(ctx, &id).await?;
            let car = hook.toggle_availability(hook.id(), available).await?;
            print_car(&car, global);
            Ok(())
        }

        CarsCommand::Delete { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            if !util::confirm(&format!("Delete car {id}?"), global.yes)? {
                return Ok(());
            }
            let hook = mount_car(ctx, &id).await?;
            hook.delete_car(hook.id()).await?;
            output::notice(&format!("Car {id} deleted"), global.quiet);
            Ok(())
        }

        CarsCommand::Restore { id } => {
            util::authorize(ctx, GuardOptions::role(Role::Dealer)).await?;
            let hook = mount_car(ctx, &id).await?;
            let car = hook.restore_car(hook.id()).await?;
            print_car(&car, global);
            Ok(())
        }
    }
}
