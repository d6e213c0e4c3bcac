use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;

use crate::components::graph_canvas::GraphCanvas;
use crate::layout::{Entity, Relationship};
use crate::store::{DomainStore, MemoryStore, Result};

/// A small three-generation family with an heirloom.
fn sample_family() -> Result<MemoryStore> {
	let mut store = MemoryStore::new();
	for entity in [
		Entity::person("rose", "Rose").at(320.0, 60.0),
		Entity::person("walter", "Walter").at(560.0, 60.0),
		Entity::person("june", "June").at(200.0, 260.0),
		Entity::person("mark", "Mark").at(680.0, 260.0),
		Entity::person("ivy", "Ivy"),
		Entity::person("theo", "Theo"),
		Entity::item("watch", "Pocket watch"),
	] {
		store.add_entity(entity)?;
	}

	for rel in [
		Relationship::new("r1", "rose", "walter", "married"),
		Relationship::new("r2", "rose", "june", "parent of").directed(Some("child of")),
		Relationship::new("r3", "walter", "june", "parent of").directed(Some("child of")),
		Relationship::new("r4", "june", "mark", "married"),
		Relationship::new("r5", "june", "ivy", "parent of").directed(Some("child of")),
		Relationship::new("r6", "mark", "theo", "parent of").directed(Some("child of")),
		Relationship::new("r7", "ivy", "theo", "sibling").directed(Some("sibling")),
		Relationship::new("r8", "walter", "watch", "owned").directed(None),
		Relationship::new("r9", "theo", "watch", "inherited").directed(None),
	] {
		store.add_relationship(rel)?;
	}
	Ok(store)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let store = match sample_family() {
		Ok(store) => store,
		Err(e) => {
			warn!("sample family not loaded: {e}");
			MemoryStore::new()
		}
	};
	let store = StoredValue::new_local(Rc::new(RefCell::new(store)));
	let revision = RwSignal::new(0u64);
	let selected = RwSignal::new(HashSet::<String>::new());
	let force = RwSignal::new(false);

	let add_entity = move |make: fn(String) -> Entity, prefix: &str| {
		store.with_value(|store| {
			let mut s = store.borrow_mut();
			let entity = Entity {
				created_at: js_sys::Date::now(),
				..make(s.new_id(prefix))
			};
			match s.add_entity(entity) {
				Ok(()) => revision.update(|r| *r += 1),
				Err(e) => warn!("{prefix} not added: {e}"),
			}
		});
	};
	let add_person = move |_| add_entity(|id| Entity::person(id, "New person"), "person");
	let add_item = move |_| add_entity(|id| Entity::item(id, "New item"), "item");

	let delete_selected = move |_| {
		let ids = selected.get_untracked();
		if ids.is_empty() {
			return;
		}
		store.with_value(|store| {
			let mut s = store.borrow_mut();
			for id in &ids {
				if let Err(e) = s.remove_entity(id) {
					warn!("{e}");
				}
			}
		});
		selected.set(HashSet::new());
		revision.update(|r| *r += 1);
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<GraphCanvas
					store=store.get_value()
					revision=revision
					selected=selected
					force=force
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Kinship Canvas"</h1>
					<p class="subtitle">
						"Drag to move. Shift-drag to connect. Double-click for an ego layout. Scroll to zoom."
					</p>
					<label>
						<input
							type="checkbox"
							prop:checked=move || force.get()
							on:change=move |_| force.update(|on| *on = !*on)
						/>
						" Force layout"
					</label>
					<button on:click=add_person>"Add person"</button>
					<button on:click=add_item>"Add item"</button>
					<button on:click=delete_selected>
						"Delete selected (" {move || selected.with(|ids| ids.len())} ")"
					</button>
				</div>
			</div>
		</ErrorBoundary>
	}
}
