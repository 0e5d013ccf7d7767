//! Built-in flow for the Vahan "Re-Schedule Renewal of Fitness" lookup.
//!
//! The scripts are configuration data: each returns `SUCCESS...` or `ERROR...` text and
//! reads request parameters through `{{reg_no}}`, `{{chassis_no}}` and `{{rto_value}}`.

use action_flow::{FlowSpec, FlowState, StepSpec};
use stealth::PacingPolicy;

pub const VAHAN_FLOW_ID: &str = "vahan-mobile-lookup";

pub const VAHAN_ENTRY_URL: &str = "https://vahan.parivahan.gov.in/vahanservice/vahan/ui/statevalidation/homepage.xhtml?statecd=Mzc2MzM2MzAzNjY0MzIzODM3NjIzNjY0MzY2MjM3NDQ0Yw==";

const SET_RTO: &str = r#"(function(){
    try {
        var selectElement = document.getElementById('fit_c_office_to_input');
        var labelElement = document.getElementById('fit_c_office_to_label');
        if (!selectElement || !labelElement) return 'ERROR: Elements not found';
        try { labelElement.click(); } catch (e) {}
        selectElement.value = {{rto_value}};
        labelElement.textContent = 'BURARI AUTO UNIT (DL' + {{rto_value}} + ')';
        ['input', 'change', 'blur'].forEach(function(evt){
            selectElement.dispatchEvent(new Event(evt, {bubbles: true}));
        });
        if (typeof PrimeFaces !== 'undefined' && PrimeFaces.ab) {
            PrimeFaces.ab({ s: "fit_c_office_to", e: "change", f: "homepageformid", p: "fit_c_office_to" });
        }
        return 'SUCCESS';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const CLICK_CHECKBOX: &str = r#"(function(){
    var selectors = ['.ui-chkbox-icon', '.ui-chkbox-box', 'input[type="checkbox"]'];
    for (var s = 0; s < selectors.length; s++) {
        var els = document.querySelectorAll(selectors[s]);
        for (var i = 0; i < els.length; i++) {
            var r = els[i].getBoundingClientRect();
            if (r.width > 0 && r.height > 0) { els[i].click(); return 'SUCCESS'; }
        }
    }
    return 'ERROR: not found';
})()"#;

const PROCEED: &str = r#"(function(){
    var btn = document.getElementById('proccedHomeButtonId');
    if (btn) { btn.click(); return 'SUCCESS: via ID'; }
    var buttons = document.querySelectorAll('button');
    for (var i = 0; i < buttons.length; i++) {
        var t = (buttons[i].textContent || '').toLowerCase();
        if (t.includes('proceed')) { buttons[i].click(); return 'SUCCESS: via text'; }
    }
    return 'ERROR';
})()"#;

const FIND_DIALOG_PROCEED: &str = r#"(function(){
    try {
        var buttons = document.querySelectorAll('button');
        for (var i = 0; i < buttons.length; i++) {
            var btn = buttons[i], onclick = btn.getAttribute('onclick') || '', t = (btn.textContent || '').toLowerCase();
            if (onclick.includes('PrimeFaces.ab') && t.includes('proceed')) return 'SUCCESS: id=' + btn.id;
        }
        if (document.getElementById('j_idt444')) return 'SUCCESS: j_idt444';
        return 'ERROR';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const CLICK_DIALOG_PROCEED: &str = r#"(function(){
    try {
        var btn = document.getElementById('j_idt444');
        if (!btn) {
            var buttons = document.querySelectorAll('button');
            for (var i = 0; i < buttons.length; i++) {
                var b = buttons[i];
                if ((b.getAttribute('onclick') || '').includes('PrimeFaces.ab') &&
                    (b.textContent || '').toLowerCase().includes('proceed')) { btn = b; break; }
            }
        }
        if (!btn) return 'ERROR: no button';
        var oc = btn.getAttribute('onclick') || '';
        var fm = oc.match(/f:"([^"]+)"/), sm = oc.match(/s:"([^"]+)"/);
        if (fm && sm && typeof PrimeFaces !== 'undefined') { PrimeFaces.ab({s: sm[1], f: fm[1]}); return 'SUCCESS: PF.ab'; }
        btn.click(); return 'SUCCESS: click';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const OPEN_SERVICES: &str = r#"(function(){
    var el = document.querySelector('a#navbarDropdownMenuLink');
    if (el) { el.click(); return 'SUCCESS'; }
    return 'ERROR';
})()"#;

const OPEN_RC_SERVICES: &str = r#"(function(){
    try {
        var el = Array.from(document.querySelectorAll('.dropdown-item')).find(function(e){
            var t = (e.textContent || '').trim().toLowerCase();
            return t.includes('rc') && t.includes('related') && t.includes('services');
        });
        if (!el) return 'ERROR';
        el.click(); return 'SUCCESS';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const OPEN_RESCHEDULE: &str = r#"(function(){
    try {
        var a = document.getElementById('fitbalcTest')
            || Array.from(document.querySelectorAll('a')).find(function(el){
                return (el.textContent || '').includes('Re-Schedule Renewal of Fitness Application');
            });
        if (!a) return 'ERROR';
        var oc = a.getAttribute('onclick') || '';
        if (oc.includes('mojarra.jsfcljs')) {
            var form = document.getElementById('loginForm');
            if (form) { mojarra.jsfcljs(form, {'fitbalcTest': 'fitbalcTest', 'pur_cd': '86'}, ''); return 'SUCCESS: mojarra'; }
        }
        a.click(); return 'SUCCESS: click';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const FILL_FORM: &str = r#"(function(){
    try {
        var reg = document.getElementById('balanceFeesFine:tf_reg_no');
        var ch = document.getElementById('balanceFeesFine:tf_chasis_no');
        if (!reg || !ch) return 'ERROR: inputs not found';
        reg.value = {{reg_no}};
        ch.value = {{chassis_no}};
        ['input', 'change', 'blur'].forEach(function(t){
            reg.dispatchEvent(new Event(t, {bubbles: true}));
            ch.dispatchEvent(new Event(t, {bubbles: true}));
        });
        return 'SUCCESS';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const VALIDATE: &str = r#"(function(){
    try {
        var b = document.getElementById('balanceFeesFine:validate_dtls');
        if (!b) return 'ERROR: btn';
        if (typeof PrimeFaces !== 'undefined') {
            PrimeFaces.ab({ s: 'balanceFeesFine:validate_dtls', f: 'balanceFeesFine', u: 'balanceFeesFine:auth_panel',
                onst: function(cfg){ try { if (PF('statusDialog')) PF('statusDialog').show(); } catch (e) {} },
                onsu: function(){ try { if (PF('statusDialog')) PF('statusDialog').hide(); } catch (e) {} }
            });
            return 'SUCCESS: PF.ab';
        }
        b.click(); return 'SUCCESS: click';
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

const GET_MOBILE: &str = r#"(function(){
    try {
        var m = document.getElementById('balanceFeesFine:tf_mobile');
        if (!m) return 'ERROR: field not found';
        return 'SUCCESS: ' + m.value;
    } catch (e) { return 'ERROR: ' + e.message; }
})()"#;

/// The eleven-step mobile number lookup.
pub fn vahan_mobile_lookup() -> FlowSpec {
    let secs = PacingPolicy::between_secs;

    FlowSpec::new(VAHAN_FLOW_ID, "Vahan mobile number lookup", VAHAN_ENTRY_URL)
        .with_pause(secs(1.0, 3.0))
        .with_navigation_pause(secs(2.0, 4.0))
        .with_step(
            StepSpec::click_if_present("Close modal", FlowState::ModalHandled, ".btn-close")
                .with_pause(secs(0.8, 1.5)),
        )
        .with_step(StepSpec::script("Set RTO", FlowState::TargetSelected, SET_RTO).with_pause(secs(2.0, 4.0)))
        .with_step(
            StepSpec::script("Click checkbox", FlowState::ConsentChecked, CLICK_CHECKBOX)
                .with_pause(secs(0.5, 1.5)),
        )
        .with_step(StepSpec::script("Proceed", FlowState::ProceedClicked, PROCEED).with_pause(secs(2.0, 4.0)))
        .with_step(
            StepSpec::conditional(
                "Confirm proceed",
                FlowState::ProceedClicked,
                FIND_DIALOG_PROCEED,
                CLICK_DIALOG_PROCEED,
            )
            .with_pause(secs(2.0, 3.0)),
        )
        .with_step(StepSpec::script("Open Services", FlowState::MenuOpened, OPEN_SERVICES).with_pause(secs(1.0, 2.0)))
        .with_step(
            StepSpec::script("Open RC Related Services", FlowState::MenuOpened, OPEN_RC_SERVICES)
                .with_pause(secs(1.0, 2.0)),
        )
        .with_step(
            StepSpec::script("Open Re-Schedule link", FlowState::MenuOpened, OPEN_RESCHEDULE)
                .with_pause(secs(2.0, 3.0)),
        )
        .with_step(
            StepSpec::script("Fill form", FlowState::FormFilled, FILL_FORM)
                .fatal()
                .with_pause(secs(0.8, 1.5)),
        )
        .with_step(
            StepSpec::script("Validate", FlowState::Validated, VALIDATE)
                .fatal()
                .with_pause(secs(2.0, 3.0)),
        )
        .with_step(StepSpec::script("Get mobile", FlowState::Extracted, GET_MOBILE).extracting())
}
