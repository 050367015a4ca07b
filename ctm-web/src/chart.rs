//! PNG stacked bar chart of PLO credits by year
//!
//! One bar per PLO row, stacked by year (semesters paired). Drawn directly
//! into an RGB buffer; the legend is four colour swatches in year order.

use ctm_common::db::{CreditRow, SEMESTERS};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use crate::{ApiError, ApiResult};

pub const YEARS: usize = SEMESTERS / 2;

/// Year 1 to 4
pub const YEAR_COLORS: [[u8; 3]; YEARS] = [
    [0x43, 0xa0, 0x47],
    [0x19, 0x76, 0xd2],
    [0xfb, 0xc0, 0x2d],
    [0xd8, 0x1b, 0x60],
];

const WIDTH: u32 = 960;
const HEIGHT: u32 = 400;
const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 50;
const MARGIN_BOTTOM: u32 = 40;
const GRID_STEP: i64 = 5;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const PLACEHOLDER_MARK: Rgb<u8> = Rgb([220, 40, 40]);

/// One bar: its label and the credits of each year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearStack {
    pub label: String,
    pub years: [i64; YEARS],
}

impl YearStack {
    pub fn total(&self) -> i64 {
        self.years.iter().sum()
    }
}

/// Pair the semesters of a credit row into years
pub fn year_stack(label: String, credits: &[i64; SEMESTERS]) -> YearStack {
    let mut years = [0i64; YEARS];
    for (year, slot) in years.iter_mut().enumerate() {
        *slot = credits[year * 2] + credits[year * 2 + 1];
    }
    YearStack { label, years }
}

/// Stacks for PLO rows in id order
pub fn stacks_for_rows(rows: &[CreditRow]) -> Vec<YearStack> {
    let mut ordered: Vec<&CreditRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.id);
    ordered
        .into_iter()
        .map(|r| year_stack(ctm_common::codes::extract_plo_tag(&r.name), &r.credits))
        .collect()
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0.min(HEIGHT)..y1.min(HEIGHT) {
        for x in x0.min(WIDTH)..x1.min(WIDTH) {
            img.put_pixel(x, y, color);
        }
    }
}

fn encode(img: &RgbImage) -> ApiResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| ApiError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes.into_inner())
}

/// Render the stacked bars as PNG bytes
pub fn render_stacked_bars(stacks: &[YearStack]) -> ApiResult<Vec<u8>> {
    if stacks.is_empty() {
        return render_placeholder();
    }

    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = HEIGHT - MARGIN_BOTTOM;

    let max_total = stacks.iter().map(YearStack::total).max().unwrap_or(0).max(1);
    // Round the scale up to the next grid line
    let scale_max = ((max_total + GRID_STEP - 1) / GRID_STEP) * GRID_STEP;
    let to_px = |credits: i64| -> u32 { (credits.max(0) as u64 * plot_h as u64 / scale_max as u64) as u32 };

    let mut level = GRID_STEP;
    while level <= scale_max {
        let y = baseline - to_px(level);
        fill_rect(&mut img, MARGIN_LEFT, y, MARGIN_LEFT + plot_w, y + 1, GRID);
        level += GRID_STEP;
    }

    let slot = (plot_w / stacks.len() as u32).max(2);
    let bar_w = (slot * 3 / 5).max(1);
    for (i, stack) in stacks.iter().enumerate() {
        let x0 = MARGIN_LEFT + slot * i as u32 + (slot - bar_w) / 2;
        let mut top = baseline;
        for (year, credits) in stack.years.iter().enumerate() {
            let h = to_px(*credits);
            if h == 0 {
                continue;
            }
            fill_rect(&mut img, x0, top - h, x0 + bar_w, top, Rgb(YEAR_COLORS[year]));
            top -= h;
        }
    }

    fill_rect(&mut img, MARGIN_LEFT - 1, MARGIN_TOP, MARGIN_LEFT + 1, baseline + 1, AXIS);
    fill_rect(&mut img, MARGIN_LEFT - 1, baseline, MARGIN_LEFT + plot_w, baseline + 2, AXIS);

    for (year, color) in YEAR_COLORS.iter().enumerate() {
        let x = WIDTH - MARGIN_RIGHT - (YEARS - year) as u32 * 30;
        fill_rect(&mut img, x, 15, x + 20, 35, Rgb(*color));
    }

    encode(&img)
}

/// Image shown when a curriculum has no PLO rows
pub fn render_placeholder() -> ApiResult<Vec<u8>> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);
    let (cx, cy) = (WIDTH / 2, HEIGHT / 2);
    fill_rect(&mut img, cx - 120, cy - 4, cx + 120, cy + 4, PLACEHOLDER_MARK);
    encode(&img)
}
