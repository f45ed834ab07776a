use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::ForceGraphState;
use crate::explorer::{ExplorerSession, GraphData};

/// Screen distance a press may travel and still count as a click.
const CLICK_TOLERANCE: f64 = 3.0;

/// Called with the id of the clicked element.
pub type ElementHandler = Rc<dyn Fn(String)>;

/// Session driving a [`ForceGraphCanvas`].
pub type CanvasSession = Rc<RefCell<ExplorerSession<ForceGraphState>>>;

enum Click {
	Node(String),
	Relationship(String),
	Background,
}

fn parent_size(canvas: &HtmlCanvasElement) -> (f64, f64) {
	canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.filter(|&(w, h)| w > 0.0 && h > 0.0)
		.unwrap_or((800.0, 600.0))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Force-directed canvas showing the session's current graph. A new `data`
/// value replaces the graph and restarts the session on it.
#[component]
pub fn ForceGraphCanvas(
	session: CanvasSession,
	#[prop(into)] data: Signal<GraphData>,
	#[prop(optional)] on_node_click: Option<ElementHandler>,
	#[prop(optional)] on_node_dblclick: Option<ElementHandler>,
	#[prop(optional)] on_relationship_click: Option<ElementHandler>,
	#[prop(optional)] on_background_click: Option<Rc<dyn Fn()>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let started = Rc::new(Cell::new(false));
	let session_init = session.clone();

	Effect::new(move |_| {
		let data = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = parent_size(&canvas);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		session_init
			.borrow_mut()
			.load(ForceGraphState::new(data, w, h));

		if started.replace(true) {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some(ctx) = context_2d(&canvas) else {
			error!("Canvas has no 2d context");
			return;
		};

		let (session_resize, canvas_resize) = (session_init.clone(), canvas.clone());
		*resize_cb.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = parent_size(&canvas_resize);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(s) = session_resize.borrow_mut().view_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (session_anim, animate_inner) = (session_init.clone(), animate.clone());
		*animate.borrow_mut() = Some(Closure::new(move || {
			if let Some(s) = session_anim.borrow_mut().view_mut() {
				if s.animation_running {
					s.tick(0.016);
				}
				render::render(s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let session_md = session.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = session_md.borrow_mut().view_mut() {
			if let Some(idx) = s.node_at_position(x, y) {
				s.drag.active = true;
				s.drag.node_idx = Some(idx);
				s.drag.start_x = x;
				s.drag.start_y = y;
				s.graph.visit_nodes(|node| {
					if node.index() == idx {
						s.drag.node_start_x = node.x();
						s.drag.node_start_y = node.y();
					}
				});
			} else {
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		}
	};

	let session_mm = session.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = session_mm.borrow_mut().view_mut() {
			if !s.drag.active {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}

			if s.drag.active {
				if let Some(idx) = s.drag.node_idx {
					let (dx, dy) = (
						(x - s.drag.start_x) / s.transform.k,
						(y - s.drag.start_y) / s.transform.k,
					);
					if dx.hypot(dy) * s.transform.k < CLICK_TOLERANCE {
						return;
					}
					let (nx, ny) = (
						s.drag.node_start_x + dx as f32,
						s.drag.node_start_y + dy as f32,
					);
					s.graph.visit_nodes_mut(|node| {
						if node.index() == idx {
							node.data.x = nx;
							node.data.y = ny;
							node.data.is_anchor = true;
						}
					});
				}
			} else if s.pan.active {
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			}
		}
	};

	let session_mu = session.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let click = {
			let mut session = session_mu.borrow_mut();
			let Some(s) = session.view_mut() else {
				return;
			};
			let (start_x, start_y) = if s.drag.active {
				(s.drag.start_x, s.drag.start_y)
			} else {
				(s.pan.start_x, s.pan.start_y)
			};
			let pressed = s.drag.active || s.pan.active;
			let click = if !pressed || (x - start_x).hypot(y - start_y) >= CLICK_TOLERANCE {
				None
			} else if s.drag.active {
				s.node_id_at(x, y).map(Click::Node)
			} else {
				Some(
					s.relationship_at_position(x, y)
						.map_or(Click::Background, Click::Relationship),
				)
			};
			match &click {
				Some(Click::Node(id) | Click::Relationship(id)) => s.selected = Some(id.clone()),
				Some(Click::Background) => s.selected = None,
				None => {}
			}
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
			click
		};

		match click {
			Some(Click::Node(id)) => {
				if let Some(handler) = &on_node_click {
					handler(id);
				}
			}
			Some(Click::Relationship(id)) => {
				if let Some(handler) = &on_relationship_click {
					handler(id);
				}
			}
			Some(Click::Background) => {
				if let Some(handler) = &on_background_click {
					handler();
				}
			}
			None => {}
		}
	};

	let session_dc = session.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let node_id = session_dc
			.borrow()
			.view()
			.and_then(|s| s.node_id_at(x, y));
		if let (Some(id), Some(handler)) = (node_id, &on_node_dblclick) {
			handler(id);
		}
	};

	let session_ml = session.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = session_ml.borrow_mut().view_mut() {
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
			s.set_hover(None);
		}
	};

	let session_wh = session.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = session_wh.borrow_mut().view_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:dblclick=on_dblclick
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
