use migration::catalog::{Catalog, CatalogObject};
use migration::publication::PUBLISHED_OBJECTS;
use migration::RefreshCost;
use serde::Serialize;
use std::error::Error;

/// An object as printed, with its rendered comment
#[derive(Serialize)]
struct ObjectEntry<'a> {
    #[serde(flatten)]
    object: &'a CatalogObject,
    comment: String,
}

#[derive(Serialize)]
struct CatalogReport<'a> {
    objects: Vec<ObjectEntry<'a>>,
    refresh_order: Vec<&'static str>,
    published: Vec<&'static str>,
}

fn report(catalog: &Catalog) -> CatalogReport<'_> {
    CatalogReport {
        objects: catalog
            .objects()
            .iter()
            .map(|object| ObjectEntry {
                object,
                comment: object.comment(),
            })
            .collect(),
        refresh_order: catalog
            .refresh_plan(RefreshCost::Heavy)
            .iter()
            .map(|view| view.name)
            .collect(),
        published: PUBLISHED_OBJECTS.to_vec(),
    }
}

/// Print the object catalog and refresh order as JSON
pub fn execute() -> Result<(), Box<dyn Error>> {
    let catalog = Catalog::full();
    catalog.validate()?;
    println!("{}", serde_json::to_string_pretty(&report(&catalog))?);
    Ok(())
}
