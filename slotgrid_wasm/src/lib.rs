use rand::{rngs::StdRng, SeedableRng};
use slotgrid_core::{
    Difficulty, EngineParams, Leverage, Presenter, RoundEngine, RoundRequest, Step, SymbolGenerator,
};
use wasm_bindgen::prelude::*;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

mod storage;
mod view;

use storage::LocalStorage;
use view::WebView;

const FRAME_MS: i32 = 50;

type Engine = RoundEngine<LocalStorage, SymbolGenerator<StdRng>>;

async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window()
            .map(|win| win.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms).is_ok())
            .unwrap_or(false);
        if !scheduled {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[function_component(App)]
fn app() -> Html {
    let engine = use_mut_ref(|| {
        Engine::new(
            EngineParams::default(),
            LocalStorage::open(),
            SymbolGenerator::new(StdRng::from_entropy()),
        )
    });
    let view = use_mut_ref(WebView::new);
    let redraw = use_force_update();
    let difficulty = use_state(|| Difficulty::Normal);
    let leverage = use_state(|| Leverage::ONE);

    {
        let engine = engine.clone();
        let view = view.clone();
        let redraw = redraw.clone();
        use_effect_with((), move |_| {
            engine.borrow().refresh(&mut *view.borrow_mut());
            redraw.force_update();
        });
    }

    let on_spin = {
        let engine = engine.clone();
        let view = view.clone();
        let redraw = redraw.clone();
        let request = RoundRequest::new(*difficulty, *leverage);
        Callback::from(move |_: MouseEvent| {
            let started = engine.borrow_mut().start(request, &mut *view.borrow_mut());
            redraw.force_update();
            if started.is_err() {
                return;
            }
            let engine = engine.clone();
            let view = view.clone();
            let redraw = redraw.clone();
            wasm_bindgen_futures::spawn_local(async move {
                loop {
                    let step = engine.borrow_mut().advance(&mut *view.borrow_mut());
                    redraw.force_update();
                    match step {
                        Some(Step::Frame(_)) => sleep_ms(FRAME_MS).await,
                        Some(Step::Settled(_)) | None => break,
                    }
                }
            });
        })
    };

    let on_theme = {
        let view = view.clone();
        let redraw = redraw.clone();
        Callback::from(move |_: MouseEvent| {
            view.borrow_mut().toggle_theme();
            redraw.force_update();
        })
    };

    let on_difficulty = {
        let difficulty = difficulty.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            difficulty.set(Difficulty::from_label(&select.value()));
        })
    };

    let on_leverage = {
        let leverage = leverage.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            leverage.set(Leverage::parse_lenient(&input.value()));
        })
    };

    let v = view.borrow();
    let spin_cost = engine.borrow().params().spin_cost;
    let page = html! {
        <div style={v.page_style()}>
            <h1>{"Slot Machine"}</h1>
            <p>{format!("Coins: {}", v.coins)}</p>
            <table class="reels">
                { for v.cells.iter().enumerate().map(|(row, cells)| html! {
                    <tr>
                        { for cells.iter().enumerate().map(|(col, symbol)| html! {
                            <td class={classes!("reel", v.highlighted.contains(&(row, col)).then_some("win"))}>
                                { symbol.clone() }
                            </td>
                        }) }
                    </tr>
                }) }
            </table>
            <select onchange={on_difficulty}>
                { for Difficulty::ALL.iter().map(|d| html! {
                    <option value={d.label()} selected={*d == *difficulty}>{ d.label() }</option>
                }) }
            </select>
            <input type="number" min="1" value={(*leverage).get().to_string()} onchange={on_leverage} />
            <button onclick={on_spin} disabled={!v.spin_enabled}>{ format!("Spin ({spin_cost} coins)") }</button>
            <button onclick={on_theme}>{"Toggle theme"}</button>
            <p style={format!("color:{}", v.message_color())}>{ v.message.clone() }</p>
            <h2>{"History"}</h2>
            <ul>
                if v.history.is_empty() {
                    <li>{"No spins yet."}</li>
                } else {
                    { for v.history.iter().map(|line| html! { <li>{ line.clone() }</li> }) }
                }
            </ul>
            <p>{ format!("{} wins", v.wins) }</p>
        </div>
    };
    page
}

#[wasm_bindgen(start)]
pub fn run() {
    console_error_panic_hook::set_once();
    yew::Renderer::<App>::new().render();
}
