pub use mediator::DefaultAsyncMediator;

use crate::features::mappings::{commands, queries};
use crate::mapping::{Filters, Indicators, Locations, SharedMappingStore};

pub mod middleware;

pub type AppMediator = DefaultAsyncMediator;

pub fn build_mediator(store: SharedMappingStore) -> AppMediator {
    DefaultAsyncMediator::builder()
        // Mapping updates
        .add_handler({
            let store = store.clone();
            move |cmd: commands::UpdateMappingsCommand<Locations>| {
                let store = store.clone();
                async move { commands::update::handle(store, cmd).await }
            }
        })
        .add_handler({
            let store = store.clone();
            move |cmd: commands::UpdateMappingsCommand<Filters>| {
                let store = store.clone();
                async move { commands::update::handle(store, cmd).await }
            }
        })
        .add_handler({
            let store = store.clone();
            move |cmd: commands::UpdateMappingsCommand<Indicators>| {
                let store = store.clone();
                async move { commands::update::handle(store, cmd).await }
            }
        })
        // Mapping plans
        .add_handler({
            let store = store.clone();
            move |query: queries::GetMappingPlanQuery<Locations>| {
                let store = store.clone();
                async move { queries::get_plan::handle(store, query).await }
            }
        })
        .add_handler({
            let store = store.clone();
            move |query: queries::GetMappingPlanQuery<Filters>| {
                let store = store.clone();
                async move { queries::get_plan::handle(store, query).await }
            }
        })
        .add_handler({
            let store = store.clone();
            move |query: queries::GetMappingPlanQuery<Indicators>| {
                let store = store.clone();
                async move { queries::get_plan::handle(store, query).await }
            }
        })
        // Publish readiness
        .add_handler({
            let store = store.clone();
            move |query: queries::GetMappingStatusQuery| {
                let store = store.clone();
                async move { queries::get_status::handle(store, query).await }
            }
        })
        .build()
}
