//! Comparable company analysis: the target against a peer set, peer statistics
//! and the valuation implied by peer multiples.

use finmodel_core::{
    Cell, CellRange, CellStyle, Expr, Layout, LineKey, NumberFormat, RowMap, Sheet, SheetKind,
    Slot, StyleRole,
};
use serde::Serialize;

use crate::assumptions::AssumptionKey as A;
use crate::context::{BuildContext, FIRST_LINE_ROW, HEADER_ROW};
use crate::input::Peer;
use crate::statements::{BsLine, IsLine};
use crate::valuation::{scaled, ValLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompLine {
    Target,
    Peer(usize),
    Mean,
    Median,
    P25,
    P75,
    ImpliedHeader,
    EvFromEbitda,
    EvFromRevenue,
    ImpliedPrice,
}

impl LineKey for CompLine {
    const SHEET: SheetKind = SheetKind::Comparables;
}

/// Table columns, starting at the label column.
const COLUMNS: [(&str, f64, NumberFormat); 9] = [
    ("Company", 30.0, NumberFormat::General),
    ("Market Cap", 14.0, NumberFormat::Integer),
    ("Revenue", 14.0, NumberFormat::Integer),
    ("EBITDA", 14.0, NumberFormat::Integer),
    ("EBITDA Margin", 14.0, NumberFormat::Percent),
    ("P/E", 11.0, NumberFormat::Ratio),
    ("EV/EBITDA", 11.0, NumberFormat::Ratio),
    ("EV/Revenue", 11.0, NumberFormat::Ratio),
    ("ROE", 11.0, NumberFormat::Percent),
];

const MARKET_CAP: u16 = 1;
const REVENUE: u16 = 2;
const EBITDA: u16 = 3;
const MARGIN: u16 = 4;
const PE: u16 = 5;
const EV_EBITDA: u16 = 6;
const EV_REVENUE: u16 = 7;
const ROE: u16 = 8;

/// Placeholder peer set used when the request carries none.
fn illustrative_peers() -> Vec<Peer> {
    [
        ("Peer Company 1", 50000.0, 25000.0, 5000.0, 0.20, 15.0, 8.5, 1.8, 0.18),
        ("Peer Company 2", 35000.0, 18000.0, 3500.0, 0.19, 18.0, 9.0, 1.7, 0.15),
        ("Peer Company 3", 75000.0, 40000.0, 8500.0, 0.21, 12.0, 7.5, 1.6, 0.22),
        ("Peer Company 4", 28000.0, 15000.0, 2800.0, 0.19, 20.0, 9.5, 1.8, 0.14),
        ("Peer Company 5", 60000.0, 32000.0, 6800.0, 0.21, 14.0, 8.0, 1.7, 0.19),
    ]
    .into_iter()
    .map(|(name, mcap, revenue, ebitda, margin, pe, ev_ebitda, ev_revenue, roe)| Peer {
        name: name.to_string(),
        market_cap: Some(mcap),
        revenue: Some(revenue),
        ebitda: Some(ebitda),
        ebitda_margin: Some(margin),
        pe: Some(pe),
        ev_ebitda: Some(ev_ebitda),
        ev_revenue: Some(ev_revenue),
        roe: Some(roe),
    })
    .collect()
}

pub fn peers(ctx: &BuildContext) -> Vec<Peer> {
    let supplied = &ctx.request.financial_data.peers;
    if supplied.is_empty() {
        illustrative_peers()
    } else {
        supplied.clone()
    }
}

pub fn layout(peer_count: usize) -> Layout<CompLine> {
    let mut slots = vec![Slot::line(CompLine::Target, "Target")];
    slots.extend((0..peer_count).map(|i| Slot::line(CompLine::Peer(i), "Peer")));
    slots.extend([
        Slot::Blank,
        Slot::Header("PEER STATISTICS"),
        Slot::line(CompLine::Mean, "Mean"),
        Slot::line(CompLine::Median, "Median"),
        Slot::line(CompLine::P25, "25th Percentile"),
        Slot::line(CompLine::P75, "75th Percentile"),
        Slot::Blank,
        Slot::Header("IMPLIED VALUATION FROM COMPS"),
        Slot::derived(CompLine::ImpliedHeader, "Method"),
        Slot::line(CompLine::EvFromEbitda, "EV (from EV/EBITDA)"),
        Slot::line(CompLine::EvFromRevenue, "EV (from EV/Revenue)"),
        Slot::total(CompLine::ImpliedPrice, "Implied Share Price Range"),
    ]);
    Layout::new(FIRST_LINE_ROW, &slots)
}

pub fn build(
    ctx: &BuildContext,
    layout: &Layout<CompLine>,
    peers: &[Peer],
    income: &RowMap<IsLine>,
    balance: &RowMap<BsLine>,
    valuation: &RowMap<ValLine>,
) -> Sheet {
    let mut sheet = ctx.new_sheet(SheetKind::Comparables, "Comparable Company Analysis".to_string());
    layout.write_labels(&mut sheet, ctx.label_col());

    let rows = layout.rows();
    let base = ctx.label_col();
    let style = |offset: u16, role: StyleRole| CellStyle::new(role, COLUMNS[offset as usize].2);

    for (i, (heading, width, _)) in COLUMNS.iter().enumerate() {
        let col = base + i as u16;
        sheet.text(HEADER_ROW, col, *heading, StyleRole::Header);
        sheet.set_column_width(col, *width);
    }

    // Target: current-year statement figures and the DCF bridge
    let target = rows.row(CompLine::Target);
    let cur = ctx.axis.last_historical().column;
    let val = ctx.value_col();
    let local = |offset: u16| Expr::cell(rows.addr(CompLine::Target, base + offset));
    sheet.text(target, base, format!("{} (Target)", ctx.company()), StyleRole::Total);
    let target_cells = [
        (MARKET_CAP, valuation.abs(ValLine::EquityValue, val)),
        (REVENUE, income.cell(IsLine::Revenue, cur)),
        (EBITDA, income.cell(IsLine::Ebitda, cur)),
        (MARGIN, Expr::safe_div(local(EBITDA), local(REVENUE))),
        (PE, Expr::safe_div(local(MARKET_CAP), income.cell(IsLine::NetIncome, cur))),
        (EV_EBITDA, Expr::safe_div(valuation.abs(ValLine::EnterpriseValue, val), local(EBITDA))),
        (EV_REVENUE, Expr::safe_div(valuation.abs(ValLine::EnterpriseValue, val), local(REVENUE))),
        (ROE, Expr::safe_div(income.cell(IsLine::NetIncome, cur), balance.cell(BsLine::TotalEquity, cur))),
    ];
    for (offset, expr) in target_cells {
        sheet.formula(target, base + offset, expr, style(offset, StyleRole::Calc));
    }

    // Peers: editable literals
    for (i, peer) in peers.iter().enumerate() {
        let row = rows.row(CompLine::Peer(i));
        let name = if peer.name.trim().is_empty() {
            format!("Peer {}", i + 1)
        } else {
            peer.name.clone()
        };
        sheet.text(row, base, name, StyleRole::Input);
        let figures = [
            (MARKET_CAP, peer.market_cap),
            (REVENUE, peer.revenue),
            (EBITDA, peer.ebitda),
            (MARGIN, peer.ebitda_margin),
            (PE, peer.pe),
            (EV_EBITDA, peer.ev_ebitda),
            (EV_REVENUE, peer.ev_revenue),
            (ROE, peer.roe),
        ];
        for (offset, value) in figures {
            match value.filter(|v| v.is_finite()) {
                Some(v) => sheet.number(row, base + offset, v, style(offset, StyleRole::Input)),
                None if offset == MARGIN && peer.revenue.is_some() && peer.ebitda.is_some() => {
                    let at = |o: u16| Expr::cell(rows.addr(CompLine::Peer(i), base + o));
                    sheet.formula(
                        row,
                        base + offset,
                        Expr::safe_div(at(EBITDA), at(REVENUE)),
                        style(offset, StyleRole::Calc),
                    );
                }
                // Left blank so the statistics skip it
                None => {}
            }
        }
    }

    // Peer statistics over every numeric column
    let stat_rows = [CompLine::Mean, CompLine::Median, CompLine::P25, CompLine::P75];
    if !peers.is_empty() {
        for offset in MARKET_CAP..=ROE {
            let col = base + offset;
            let start = rows.addr(CompLine::Peer(0), col);
            let end = rows.addr(CompLine::Peer(peers.len() - 1), col);
            for key in stat_rows {
                let stat = match key {
                    CompLine::Mean => Expr::average(start, end),
                    CompLine::Median => Expr::median(start, end),
                    CompLine::P25 => Expr::percentile(start, end, 0.25),
                    _ => Expr::percentile(start, end, 0.75),
                };
                sheet.formula(rows.row(key), col, stat.or_zero(), style(offset, StyleRole::Calc));
            }
        }
    }

    // Implied valuation at the 25th percentile, mean and 75th percentile
    let header = rows.row(CompLine::ImpliedHeader);
    let bands = [(CompLine::P25, "Low (25th)"), (CompLine::Mean, "Mid (Mean)"), (CompLine::P75, "High (75th)")];
    sheet.text(header, base, "Method", StyleRole::Header);
    let shares = ctx.assumptions.cell(A::SharesOutstanding);
    let net_debt = valuation.abs(ValLine::NetDebt, val);
    let scale = ctx.settings.units.per_share_scale;
    for (i, (stat, heading)) in bands.iter().enumerate() {
        let col = base + 1 + i as u16;
        sheet.text(header, col, *heading, StyleRole::Header);
        let multiple = |offset: u16| rows.cell(*stat, base + offset);
        let target_figure = |offset: u16| rows.abs(CompLine::Target, base + offset);
        let integer = CellStyle::new(StyleRole::Calc, NumberFormat::Integer);
        sheet.formula(
            rows.row(CompLine::EvFromEbitda),
            col,
            multiple(EV_EBITDA) * target_figure(EBITDA),
            integer,
        );
        sheet.formula(
            rows.row(CompLine::EvFromRevenue),
            col,
            multiple(EV_REVENUE) * target_figure(REVENUE),
            integer,
        );
        sheet.formula(
            rows.row(CompLine::ImpliedPrice),
            col,
            scaled(
                Expr::safe_div(rows.cell(CompLine::EvFromEbitda, col) - net_debt.clone(), shares.clone()),
                scale,
            ),
            CellStyle::new(StyleRole::Output, NumberFormat::Currency),
        );
    }

    sheet.merge(
        CellRange::row_span(SheetKind::Comparables, HEADER_ROW - 1, base, base + ROE),
        Cell::text("COMPARABLE COMPANY ANALYSIS", StyleRole::Section),
    );
    sheet.freeze_panes(FIRST_LINE_ROW, base + 1);
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statements::StatementLayouts;
    use crate::test_support::Fixture;
    use crate::valuation;

    fn build_with(json: &str) -> (Sheet, Layout<CompLine>, usize) {
        let fx = Fixture::new(json);
        let ctx = fx.context();
        let statements = StatementLayouts::new();
        let peers = peers(&ctx);
        let layout = layout(peers.len());
        let sheet = build(
            &ctx,
            &layout,
            &peers,
            statements.income.rows(),
            statements.balance.rows(),
            valuation::layout().rows(),
        );
        (sheet, layout, peers.len())
    }

    #[test]
    fn falls_back_to_illustrative_peers() {
        let (sheet, layout, count) = build_with("{}");
        assert_eq!(count, 5);
        let row = layout.rows().row(CompLine::Peer(2));
        assert_eq!(sheet.get(row, 1).unwrap().as_text(), Some("Peer Company 3"));
        assert_eq!(sheet.get(row, 2).unwrap().as_number(), Some(75000.0));
    }

    #[test]
    fn supplied_peers_and_derived_margin() {
        let (sheet, layout, count) = build_with(
            r#"{"financial_data": {"peers": [
                {"name": "Alpha", "revenue": 1000, "ebitda": 250, "ev_ebitda": 9.5},
                {"name": "Beta", "revenue": "2000", "ebitda_margin": 0.3}
            ]}}"#,
        );
        assert_eq!(count, 2);
        let rows = layout.rows();
        let alpha = rows.row(CompLine::Peer(0));
        assert!(sheet.get(alpha, 5).unwrap().is_formula());
        assert!(sheet.get(alpha, 6).is_none());
        let mean = sheet.get(rows.row(CompLine::Mean), 7).unwrap();
        assert_eq!(
            mean.as_formula().unwrap().to_formula(SheetKind::Comparables),
            format!("=IFERROR(AVERAGE(H{}:H{}),0)", alpha + 1, alpha + 2)
        );
    }

    #[test]
    fn target_pulls_current_year_figures() {
        let (sheet, layout, _) = build_with("{}");
        let target = layout.rows().row(CompLine::Target);
        let revenue = sheet.get(target, 3).unwrap().as_formula().unwrap();
        // Last historical year (FY base-1) sits in column G
        assert_eq!(revenue.to_formula(SheetKind::Comparables), "=Income_Statement!G6");
    }
}
