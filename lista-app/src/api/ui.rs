//! UI route: single-page listing assistant (vanilla JS, no frameworks)

use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

use crate::AppState;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new().route("/", get(root_page))
}

/// Root page
async fn root_page() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="de">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Lista - Anzeigen-Assistent</title>
    <style>
        body { font-family: system-ui, -apple-system, sans-serif; margin: 0; display: flex; height: 100vh; }
        body.accessible { font-size: 1.25em; }
        #sidebar { width: 260px; border-right: 1px solid #ddd; overflow-y: auto; padding: 10px; }
        #main { flex: 1; overflow-y: auto; padding: 20px; }
        h1 { font-size: 1.3em; border-bottom: 2px solid #0066cc; padding-bottom: 6px; }
        h2 { font-size: 1.1em; margin-top: 24px; }
        .item { padding: 6px 8px; cursor: pointer; border-radius: 4px; }
        .item:hover, .item.active { background: #e6f0fa; }
        .gallery { display: flex; flex-wrap: wrap; gap: 10px; }
        .thumb { position: relative; width: 220px; user-select: none; }
        .thumb img { width: 100%; display: block; border: 3px solid transparent; cursor: crosshair; }
        .thumb.selected img { border-color: #0066cc; }
        .thumb .box { position: absolute; border: 2px dashed #ff6600; pointer-events: none; }
        .thumb .order { position: absolute; top: 4px; left: 4px; background: #0066cc; color: #fff; padding: 0 6px; border-radius: 3px; }
        label { display: block; margin-top: 8px; }
        input, textarea, select { width: 100%; box-sizing: border-box; padding: 6px; }
        textarea { height: 160px; }
        button { padding: 8px 16px; margin: 6px 6px 0 0; background: #0066cc; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }
        button.secondary { background: #666; }
        button:disabled { background: #aaa; }
        #status { margin-top: 10px; white-space: pre-wrap; font-family: monospace; font-size: 0.85em; }
        table { border-collapse: collapse; width: 100%; }
        td, th { border-bottom: 1px solid #eee; padding: 4px; text-align: left; }
    </style>
</head>
<body>
<div id="sidebar">
    <h1>Artikel</h1>
    <button onclick="processInbox()">Inbox verarbeiten</button>
    <div id="items"></div>
</div>
<div id="main">
    <div id="editor" hidden>
        <h1 id="itemTitle"></h1>
        <p>Bild anklicken zum Auswählen, ziehen zum Zuschneiden.</p>
        <div class="gallery" id="gallery"></div>

        <h2>Sprachnotiz</h2>
        <button id="recordBtn" onclick="toggleRecording()">Aufnahme starten</button>

        <h2>Anzeige</h2>
        <label>Titel <input id="title"></label>
        <label>Beschreibung <textarea id="description"></textarea></label>
        <label>Kategorie <input id="category"></label>
        <label>Preis <input id="price" type="number" min="0"></label>
        <label>Preistyp
            <select id="price_type">
                <option>NEGOTIABLE</option><option>FIXED</option><option>GIVE_AWAY</option>
            </select>
        </label>
        <label>Versand
            <select id="shipping_type">
                <option>SHIPPING</option><option>PICKUP</option>
            </select>
        </label>
        <button onclick="submitItem()">Speichern</button>
        <button class="secondary" onclick="discardItem()">Verwerfen</button>
    </div>

    <h2>Ausstehende Anzeigen</h2>
    <table><thead><tr><th>Ordner</th><th>Titel</th><th>Preis</th><th></th></tr></thead><tbody id="pending"></tbody></table>
    <button onclick="publishAll()">Alle veröffentlichen</button>
    <button class="secondary" onclick="undoAll()">Alle rückgängig</button>

    <h2>Archiv</h2>
    <span id="archiveInfo"></span>
    <button class="secondary" onclick="clearArchive()">Archiv leeren</button>

    <div id="status"></div>
</div>
<script>
let current = null;      // {id, name}
let selections = [];     // [{url, crop}]
let audioId = null;
let recorder = null;
let chunks = [];

const $ = (id) => document.getElementById(id);
const status = (msg) => { $('status').textContent = msg; };

async function api(method, url, body) {
    const opts = { method };
    if (body instanceof FormData) {
        opts.body = body;
    } else if (body !== undefined) {
        opts.headers = { 'Content-Type': 'application/json' };
        opts.body = JSON.stringify(body);
    }
    const res = await fetch(url, opts);
    const data = await res.json().catch(() => ({}));
    if (!res.ok) {
        throw new Error((data.error && data.error.message) || res.statusText);
    }
    return data;
}

async function loadItems(selectId) {
    const data = await api('GET', '/api/items');
    const list = $('items');
    list.innerHTML = '';
    for (const it of data.items) {
        const div = document.createElement('div');
        div.className = 'item' + (current && current.id === it.id ? ' active' : '');
        div.textContent = `${it.name} (${it.imageCount})`;
        div.onclick = () => openItem(it.id);
        list.appendChild(div);
    }
    if (selectId !== undefined && selectId !== null) {
        await openItem(selectId);
    } else if (!data.items.length) {
        $('editor').hidden = true;
    }
}

async function openItem(id) {
    const data = await api('GET', `/api/items/${id}/images`);
    current = data.item;
    selections = [];
    audioId = null;
    $('editor').hidden = false;
    $('itemTitle').textContent = current.name;
    for (const f of ['title', 'description', 'category', 'price']) $(f).value = '';
    const gallery = $('gallery');
    gallery.innerHTML = '';
    for (const url of data.images) gallery.appendChild(makeThumb(url));
    document.querySelectorAll('.item').forEach((el, i) => el.classList.toggle('active', i === id));
}

function makeThumb(url) {
    const wrap = document.createElement('div');
    wrap.className = 'thumb';
    const img = document.createElement('img');
    img.src = url;
    img.draggable = false;
    wrap.appendChild(img);

    let start = null;
    img.onmousedown = (e) => {
        const r = img.getBoundingClientRect();
        start = { x: (e.clientX - r.left) / r.width, y: (e.clientY - r.top) / r.height };
    };
    img.onmouseup = (e) => {
        if (!start) return;
        const r = img.getBoundingClientRect();
        const end = { x: (e.clientX - r.left) / r.width, y: (e.clientY - r.top) / r.height };
        const w = Math.abs(end.x - start.x), h = Math.abs(end.y - start.y);
        const dragged = w > 0.02 && h > 0.02;
        const crop = dragged
            ? { x: Math.min(start.x, end.x), y: Math.min(start.y, end.y), w, h }
            : { x: 0, y: 0, w: 1, h: 1 };
        start = null;
        toggleSelection(wrap, url, crop, dragged);
    };
    return wrap;
}

function toggleSelection(wrap, url, crop, dragged) {
    const idx = selections.findIndex((s) => s.url === url);
    if (idx >= 0 && !dragged) {
        selections.splice(idx, 1);
    } else if (idx >= 0) {
        selections[idx].crop = crop;
    } else {
        selections.push({ url, crop });
    }
    renderSelections();
}

function renderSelections() {
    document.querySelectorAll('.thumb').forEach((wrap) => {
        const url = wrap.querySelector('img').getAttribute('src');
        wrap.querySelectorAll('.box, .order').forEach((el) => el.remove());
        const idx = selections.findIndex((s) => s.url === url);
        wrap.classList.toggle('selected', idx >= 0);
        if (idx < 0) return;
        const c = selections[idx].crop;
        const box = document.createElement('div');
        box.className = 'box';
        Object.assign(box.style, { left: `${c.x * 100}%`, top: `${c.y * 100}%`, width: `${c.w * 100}%`, height: `${c.h * 100}%` });
        const order = document.createElement('span');
        order.className = 'order';
        order.textContent = idx + 1;
        wrap.appendChild(box);
        wrap.appendChild(order);
    });
}

async function toggleRecording() {
    if (recorder && recorder.state === 'recording') {
        recorder.stop();
        return;
    }
    const stream = await navigator.mediaDevices.getUserMedia({ audio: true });
    recorder = new MediaRecorder(stream);
    chunks = [];
    recorder.ondataavailable = (e) => chunks.push(e.data);
    recorder.onstop = async () => {
        stream.getTracks().forEach((t) => t.stop());
        $('recordBtn').textContent = 'Aufnahme starten';
        const form = new FormData();
        form.append('file', new Blob(chunks, { type: 'audio/webm' }), 'note.webm');
        status('Entwurf wird erstellt...');
        try {
            const data = await api('POST', `/api/audio/${current.id}`, form);
            audioId = data.audioId;
            const d = data.draft;
            $('title').value = d.title;
            $('description').value = d.description;
            $('category').value = d.category;
            $('price').value = d.price;
            $('price_type').value = d.price_type;
            $('shipping_type').value = d.shipping_type;
            status('Entwurf erstellt.');
        } catch (e) {
            status('Fehler: ' + e.message);
        }
    };
    recorder.start();
    $('recordBtn').textContent = 'Aufnahme beenden';
}

async function submitItem() {
    if (!current) return;
    const metadata = {
        type: 'OFFER',
        title: $('title').value,
        description: $('description').value,
        category: $('category').value,
        price: $('price').value,
        price_type: $('price_type').value,
        shipping_type: $('shipping_type').value,
    };
    try {
        const res = await api('POST', `/api/items/${current.id}/submit`, {
            metadata,
            selections,
            audio_id: audioId,
            image_order: selections.map((s) => s.url),
        });
        status(`Gespeichert: ${res.ad_file}`);
        await refreshAll(res.nextItemId === null ? null : current.id);
    } catch (e) {
        status('Fehler: ' + e.message);
    }
}

async function discardItem() {
    if (!current) return;
    await api('POST', `/api/items/${current.id}/delete_input`);
    await refreshAll(current.id);
}

async function loadPending() {
    const data = await api('GET', '/api/pending');
    const body = $('pending');
    body.innerHTML = '';
    for (const ad of data.pending) {
        const tr = document.createElement('tr');
        tr.innerHTML = `<td></td><td></td><td></td><td><button class="secondary">Rückgängig</button></td>`;
        tr.children[0].textContent = ad.dir;
        tr.children[1].textContent = ad.title;
        tr.children[2].textContent = ad.price === null ? '' : ad.price;
        tr.querySelector('button').onclick = async () => {
            await api('POST', '/api/pending/undo', { dir: ad.dir });
            await refreshAll();
        };
        body.appendChild(tr);
    }
}

async function loadArchiveInfo() {
    const data = await api('GET', '/api/archive/info');
    $('archiveInfo').textContent = data.human;
}

async function refreshAll(selectId) {
    try {
        await loadItems(selectId);
    } catch (e) {
        current = null;
        $('editor').hidden = true;
        await loadItems();
    }
    await loadPending();
    await loadArchiveInfo();
}

async function publishAll() {
    status('Veröffentliche...');
    try {
        const res = await api('POST', '/api/publish_all');
        status(res.message || `Exit-Code ${res.returncode}\n${res.stdout}\n${res.stderr}`);
    } catch (e) {
        status('Fehler: ' + e.message);
    }
    await refreshAll();
}

async function undoAll() {
    const res = await api('POST', '/api/pending/undo_all');
    status(`${res.restored} von ${res.count} wiederhergestellt.`);
    await refreshAll();
}

async function clearArchive() {
    if (!confirm('Archiv wirklich leeren?')) return;
    await api('POST', '/api/archive/clear');
    await loadArchiveInfo();
}

async function processInbox() {
    try {
        const r = await api('POST', '/api/inbox/process');
        status(`${r.items_created.length} Artikel angelegt, ${r.images_moved} Bilder, ${r.separators_removed} Trennbilder.`);
    } catch (e) {
        status('Fehler: ' + e.message);
    }
    await refreshAll();
}

(async () => {
    const cfg = await api('GET', '/api/config/accessibility');
    document.body.classList.toggle('accessible', !!cfg.accessibility);
    await refreshAll(0);
})();
</script>
</body>
</html>
"#;
