mod bulk;
mod crud;
mod cursor;
mod model;
mod relations;
mod schema;
mod validation;
mod views;

use crate::{
    bulk::bulk, crud::crud, cursor::cursors, relations::relations, schema::schema,
    validation::validation, views::views,
};
use helm_core::{EntityHelper, EntityModel};
use log::LevelFilter;
use std::env;

pub use model::model;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the whole suite against an empty datasource.
pub async fn execute_tests(helper: &dyn EntityHelper) {
    let model = model();
    prepare(helper, &model).await;
    schema(helper, &model).await;
    crud(helper, &model).await;
    validation(helper, &model).await;
    bulk(helper, &model).await;
    cursors(helper, &model).await;
    views(helper, &model).await;
    relations(helper, &model).await;
}

/// Create every table of `model` and check the datasource is then clean.
pub async fn prepare(helper: &dyn EntityHelper, model: &EntityModel) {
    let mut messages = Vec::new();
    helper
        .check_data_source(model.entities(), &mut messages, true)
        .await
        .expect("Failed to create the tables of the model");
    let mut messages = Vec::new();
    helper
        .check_data_source(model.entities(), &mut messages, false)
        .await
        .expect("Failed to check the datasource");
    assert!(
        messages.is_empty(),
        "The datasource should match the model after adding the missing tables, got: {:#?}",
        messages
    );
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
